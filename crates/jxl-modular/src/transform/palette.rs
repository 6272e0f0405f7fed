//! Palette inverse transform: expands an index channel (plus, for negative
//! or out-of-range indices, a synthesized or delta-coded colour) back into
//! `num_c` colour channels, using a meta-channel of looked-up palette rows.

use jxl_grid::SimpleGrid;

use crate::predictor::{Predictor, PredictorState};
use crate::Sample;

use super::Palette;

#[rustfmt::skip]
const DELTA_PALETTE: [[i16; 3]; 72] = [
    [0, 0, 0], [4, 4, 4], [11, 0, 0], [0, 0, -13], [0, -12, 0], [-10, -10, -10],
    [-18, -18, -18], [-27, -27, -27], [-18, -18, 0], [0, 0, -32], [-32, 0, 0], [-37, -37, -37],
    [0, -32, -32], [24, 24, 45], [50, 50, 50], [-45, -24, -24], [-24, -45, -45], [0, -24, -24],
    [-34, -34, 0], [-24, 0, -24], [-45, -45, -24], [64, 64, 64], [-32, 0, -32], [0, -32, 0],
    [-32, 0, 32], [-24, -45, -24], [45, 24, 45], [24, -24, -45], [-45, -24, 24], [80, 80, 80],
    [64, 0, 0], [0, 0, -64], [0, -64, -64], [-24, -24, 45], [96, 96, 96], [64, 64, 0],
    [45, -24, -24], [34, -34, 0], [112, 112, 112], [24, -45, -45], [45, 45, -24], [0, -32, 32],
    [24, -24, 45], [0, 96, 96], [45, -24, 24], [24, -45, -24], [-24, -45, 24], [0, -64, 0],
    [96, 0, 0], [128, 128, 128], [64, 0, 64], [144, 144, 144], [96, 96, 0], [-36, -36, 36],
    [45, -24, -45], [45, -45, -24], [0, 0, -96], [0, 128, 128], [0, 96, 0], [45, 24, -45],
    [-128, 0, 0], [24, -45, 24], [-45, 24, -45], [64, 0, -64], [64, -64, -64], [96, 0, 96],
    [45, -45, 24], [24, 45, -45], [64, 64, -64], [128, 128, 0], [0, 0, -128], [-24, 45, -45],
];

impl Palette {
    /// `palette` holds `num_c` rows of `nb_colours` looked-up values
    /// (row `c`, column `index`). `targets[0]` is the index channel on
    /// input and becomes colour channel 0 on output; `targets[1..]` are the
    /// other `num_c - 1` colour channels, in order.
    pub(crate) fn inverse_inner<S: Sample>(
        &self,
        palette: &SimpleGrid<S>,
        targets: &mut [&mut SimpleGrid<S>],
        bit_depth: u32,
    ) {
        let nb_deltas = self.nb_deltas as i32;
        let nb_colours = self.nb_colours as i32;
        let width = targets[0].width();
        let height = targets[0].height();

        let is_simple = (0..height).all(|y| {
            targets[0]
                .row(y)
                .iter()
                .all(|s| (0..nb_colours).contains(&s.to_i32()))
        });

        if is_simple {
            inverse_simple(palette, targets);
            return;
        }

        tracing::trace!("Inverse palette, slow path");

        let mut need_delta = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let index = targets[0].get(x, y).to_i32();
                if index < nb_deltas {
                    need_delta.push((x, y));
                }

                if (0..nb_colours).contains(&index) {
                    for (c, target) in targets.iter_mut().enumerate() {
                        target.set(x, y, *palette.get(index as usize, c));
                    }
                } else if index >= nb_colours {
                    let index = index - nb_colours;
                    if index < 64 {
                        for (c, target) in targets.iter_mut().enumerate() {
                            let value = ((index >> (2 * c)) % 4) * ((1i32 << bit_depth) - 1) / 4
                                + (1i32 << bit_depth.saturating_sub(3));
                            target.set(x, y, S::from_i32(value));
                        }
                    } else {
                        let mut index = index - 64;
                        for target in targets.iter_mut() {
                            let value = (index % 5) * ((1i32 << bit_depth) - 1) / 4;
                            target.set(x, y, S::from_i32(value));
                            index /= 5;
                        }
                    }
                } else {
                    for (c, target) in targets.iter_mut().enumerate() {
                        if c >= 3 {
                            target.set(x, y, S::default());
                            continue;
                        }
                        let index = -(index + 1);
                        let index = (index % 143) as usize;
                        let mut value = DELTA_PALETTE[(index + 1) >> 1][c] as i32;
                        if index & 1 == 0 {
                            value = -value;
                        }
                        if bit_depth > 8 {
                            value <<= bit_depth.min(24) - 8;
                        }
                        target.set(x, y, S::from_i32(value));
                    }
                }
            }
        }

        if need_delta.is_empty() {
            return;
        }

        let d_pred = self.d_pred;
        let wp_header = if d_pred == Predictor::SelfCorrecting {
            self.wp_header.as_ref()
        } else {
            None
        };

        'outer: for target in targets.iter_mut() {
            let mut state = PredictorState::new(width as u32, 0, 0, 0, wp_header);
            let mut idx = 0;
            for y in 0..height {
                for x in 0..width {
                    let properties = state.properties(&[]);
                    let mut sample_value = target.get(x, y).to_i32();
                    if need_delta[idx] == (x, y) {
                        let diff = d_pred.predict(&properties);
                        sample_value = sample_value.wrapping_add(diff as i32);
                        target.set(x, y, S::from_i32(sample_value));
                        idx += 1;
                        properties.record(sample_value);
                        if idx >= need_delta.len() {
                            continue 'outer;
                        }
                        continue;
                    }
                    properties.record(sample_value);
                }
            }
        }
    }
}

fn inverse_simple<S: Sample>(palette: &SimpleGrid<S>, targets: &mut [&mut SimpleGrid<S>]) {
    tracing::trace!("Inverse palette, fast path");
    let height = targets[0].height();

    // Colour channels 1.. are looked up directly from the index channel,
    // which is still holding indices at this point.
    for c in 1..targets.len() {
        for y in 0..height {
            let width = targets[0].width();
            for x in 0..width {
                let index = targets[0].get(x, y).to_i32() as usize;
                let value = *palette.get(index, c);
                targets[c].set(x, y, value);
            }
        }
    }
    // Channel 0 is rewritten last since the lookups above still need it.
    let width = targets[0].width();
    for y in 0..height {
        for x in 0..width {
            let index = targets[0].get(x, y).to_i32() as usize;
            let value = *palette.get(index, 0);
            targets[0].set(x, y, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::WpHeader;

    #[test]
    fn simple_lookup_expands_index_channel() {
        let mut palette = SimpleGrid::<i32>::new(2, 2); // 2 colours, 2 channels
        palette.set(0, 0, 100); // colour 0, channel 0
        palette.set(1, 0, 200); // colour 1, channel 0
        palette.set(0, 1, 10); // colour 0, channel 1
        palette.set(1, 1, 20); // colour 1, channel 1

        let mut idx = SimpleGrid::<i32>::new(2, 1);
        idx.set(0, 0, 1);
        idx.set(1, 0, 0);
        let mut ch1 = SimpleGrid::<i32>::new(2, 1);

        let pal = Palette {
            begin_c: 0,
            num_c: 2,
            nb_colours: 2,
            nb_deltas: 0,
            d_pred: Predictor::Zero,
            wp_header: None::<WpHeader>,
        };
        let mut targets: Vec<&mut SimpleGrid<i32>> = vec![&mut idx, &mut ch1];
        pal.inverse_inner(&palette, &mut targets, 8);
        assert_eq!(*idx.get(0, 0), 200);
        assert_eq!(*idx.get(1, 0), 100);
        assert_eq!(*ch1.get(0, 0), 20);
        assert_eq!(*ch1.get(1, 0), 10);
    }
}
