use std::collections::VecDeque;
use std::sync::Arc;

use jxl_bitstream::{unpack_signed, Bitstream};
use jxl_bundle::Bundle;
use jxl_coding::Decoder;
use jxl_grid::AllocTracker;

use crate::predictor::{Predictor, Properties};
use crate::Result;

/// Meta-adaptive tree configuration: the decision tree plus the entropy
/// decoder distribution it was read alongside. Shared read-only across every
/// modular sub-decoder that uses the global tree.
#[derive(Debug, Clone)]
pub struct MaConfig {
    num_tree_nodes: usize,
    tree_depth: usize,
    tree: Arc<MaTreeNode>,
    decoder: Decoder,
}

impl MaConfig {
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn num_tree_nodes(&self) -> usize {
        self.num_tree_nodes
    }

    pub fn tree_depth(&self) -> usize {
        self.tree_depth
    }

    /// Flattens the tree into an array suitable for fast per-pixel walks.
    pub fn make_flat_tree(&self) -> FlatMaTree {
        let mut nodes = Vec::new();
        flatten_node(&self.tree, &mut nodes);
        FlatMaTree::new(nodes)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct MaConfigParams<'a> {
    pub tracker: Option<&'a AllocTracker>,
    pub node_limit: usize,
}

impl Bundle<MaConfigParams<'_>> for MaConfig {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream, params: MaConfigParams) -> Result<Self> {
        struct FoldingTreeLeaf {
            ctx: u32,
            predictor: Predictor,
            offset: i32,
            multiplier: u32,
        }

        enum FoldingTree {
            Decision(u32, i32),
            Leaf(FoldingTreeLeaf),
        }

        let MaConfigParams { tracker, node_limit } = params;
        let _ = tracker; // the temporary fold buffer below is short-lived and not budget-tracked

        let mut tree_decoder = Decoder::parse(bitstream, 6)?;
        if is_infinite_tree_dist(&tree_decoder) {
            tracing::error!("MA tree distribution never terminates");
            return Err(crate::Error::InvalidMaTree);
        }

        let mut ctx = 0u32;
        let mut nodes_left = 1usize;
        let mut nodes = Vec::new();
        let mut max_depth = 1usize;

        tree_decoder.begin(bitstream)?;
        while nodes_left > 0 {
            if nodes.len() >= (1 << 26) || nodes.len() > node_limit {
                tracing::error!(node_limit, "MA tree node count exceeds the limit");
                return Err(crate::Error::InvalidMaTree);
            }

            nodes_left -= 1;
            let property = tree_decoder.read_varint(bitstream, 1)?;
            let node = if let Some(property) = property.checked_sub(1) {
                let value = unpack_signed(tree_decoder.read_varint(bitstream, 0)?);
                nodes_left += 2;
                FoldingTree::Decision(property, value)
            } else {
                let predictor = tree_decoder.read_varint(bitstream, 2)?;
                let predictor = Predictor::try_from(predictor)?;
                let offset = unpack_signed(tree_decoder.read_varint(bitstream, 3)?);
                let mul_log = tree_decoder.read_varint(bitstream, 4)?;
                if mul_log > 30 {
                    return Err(crate::Error::InvalidMaTree);
                }
                let mul_bits = tree_decoder.read_varint(bitstream, 5)?;
                if mul_bits > (1 << (31 - mul_log)) - 2 {
                    return Err(crate::Error::InvalidMaTree);
                }
                let multiplier = (mul_bits + 1) << mul_log;
                let node = FoldingTree::Leaf(FoldingTreeLeaf { ctx, predictor, offset, multiplier });
                ctx += 1;
                node
            };
            nodes.push(node);
            max_depth = max_depth.max(nodes_left);
        }
        tree_decoder.finalize()?;
        let num_tree_nodes = nodes.len();
        let decoder = Decoder::parse(bitstream, ctx)?;
        let cluster_map = decoder.cluster_map();

        // Nodes were read breadth-first (spec §4.6: children follow their
        // parent as depth-first relative offsets once flattened, but the
        // bitstream itself interleaves a node count budget per level). Undo
        // that by reversing and pairing up children with a queue, the same
        // way canonical-code lengths are unwound from a counted stream.
        let mut tmp = VecDeque::<(MaTreeNode, usize)>::with_capacity(max_depth);
        for node in nodes.into_iter().rev() {
            match node {
                FoldingTree::Decision(property, value) => {
                    let (right, dr) = tmp.pop_front().unwrap();
                    let (left, dl) = tmp.pop_front().unwrap();
                    let node = MaTreeNode::Decision {
                        property,
                        value,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    tmp.push_back((node, dr.max(dl) + 1));
                }
                FoldingTree::Leaf(FoldingTreeLeaf { ctx, predictor, offset, multiplier }) => {
                    let cluster = cluster_map[ctx as usize];
                    let leaf = MaTreeLeaf { cluster, predictor, offset, multiplier };
                    tmp.push_back((MaTreeNode::Leaf(leaf), 0));
                }
            }
        }
        assert_eq!(tmp.len(), 1);
        let (tree, tree_depth) = tmp.pop_front().unwrap();

        Ok(Self {
            num_tree_nodes,
            tree_depth,
            tree: Arc::new(tree),
            decoder,
        })
    }
}

fn is_infinite_tree_dist(decoder: &Decoder) -> bool {
    let cluster_map = decoder.cluster_map();
    let cluster = cluster_map[1];
    let Some(token) = decoder.single_token(cluster) else {
        return false;
    };
    token != 0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MaTreeLeaf {
    pub(crate) cluster: u8,
    pub(crate) predictor: Predictor,
    pub(crate) offset: i32,
    pub(crate) multiplier: u32,
}

#[derive(Debug)]
enum MaTreeNode {
    Decision {
        property: u32,
        value: i32,
        left: Box<MaTreeNode>,
        right: Box<MaTreeNode>,
    },
    Leaf(MaTreeLeaf),
}

#[derive(Debug)]
enum FlatNode {
    Decision { property: u32, value: i32, left: u32, right: u32 },
    Leaf(MaTreeLeaf),
}

/// Depth-first flattening: each node's children are emitted before the node
/// itself, so a decision can store its children's already-known indices.
/// The root always ends up last.
fn flatten_node(node: &MaTreeNode, out: &mut Vec<FlatNode>) -> u32 {
    match node {
        MaTreeNode::Leaf(leaf) => {
            out.push(FlatNode::Leaf(leaf.clone()));
            (out.len() - 1) as u32
        }
        MaTreeNode::Decision { property, value, left, right } => {
            let left = flatten_node(left, out);
            let right = flatten_node(right, out);
            out.push(FlatNode::Decision { property: *property, value: *value, left, right });
            (out.len() - 1) as u32
        }
    }
}

/// A flattened meta-adaptive tree, ready to walk per pixel.
#[derive(Debug)]
pub struct FlatMaTree {
    nodes: Vec<FlatNode>,
    need_self_correcting: bool,
}

impl FlatMaTree {
    fn new(nodes: Vec<FlatNode>) -> Self {
        let need_self_correcting = nodes.iter().any(|node| match node {
            FlatNode::Decision { property, .. } => *property == 15,
            FlatNode::Leaf(leaf) => leaf.predictor == Predictor::SelfCorrecting,
        });
        Self { nodes, need_self_correcting }
    }

    /// Whether any reachable leaf uses the weighted predictor, or any
    /// decision inspects its error-magnitude property — callers can skip
    /// initializing the (expensive) weighted predictor state if not.
    pub fn need_self_correcting(&self) -> bool {
        self.need_self_correcting
    }

    #[inline]
    fn get_leaf(&self, properties: &Properties) -> &MaTreeLeaf {
        let mut idx = self.nodes.len() - 1;
        loop {
            match &self.nodes[idx] {
                FlatNode::Decision { property, value, left, right } => {
                    let v = properties.get(*property as usize);
                    idx = if v > *value { *left as usize } else { *right as usize };
                }
                FlatNode::Leaf(leaf) => return leaf,
            }
        }
    }

    /// Decodes one sample: walks the tree to a leaf, reads its token from
    /// the entropy decoder, and folds in the leaf's offset/multiplier.
    pub fn decode_sample(
        &self,
        bitstream: &mut Bitstream,
        decoder: &mut Decoder,
        properties: &Properties,
        dist_multiplier: u32,
    ) -> Result<(i32, Predictor)> {
        let leaf = self.get_leaf(properties);
        let diff = decoder.read_varint_with_multiplier_clustered(bitstream, leaf.cluster, dist_multiplier)?;
        let diff = unpack_signed(diff).wrapping_mul(leaf.multiplier as i32).wrapping_add(leaf.offset);
        Ok((diff, leaf.predictor))
    }

    /// Returns the lone leaf if this tree never branches on a property —
    /// lets the caller take a fast uniform-predictor path over a channel.
    pub(crate) fn single_node(&self) -> Option<&MaTreeLeaf> {
        match self.nodes.as_slice() {
            [FlatNode::Leaf(leaf)] => Some(leaf),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_single_leaf_puts_it_last() {
        let leaf = MaTreeLeaf { cluster: 0, predictor: Predictor::Zero, offset: 0, multiplier: 1 };
        let tree = MaTreeNode::Leaf(leaf.clone());
        let mut out = Vec::new();
        let root = flatten_node(&tree, &mut out);
        assert_eq!(root as usize, out.len() - 1);
        assert!(matches!(&out[root as usize], FlatNode::Leaf(l) if *l == leaf));
    }
}
