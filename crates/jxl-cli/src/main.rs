//! Minimal CLI over the `jxl` decoder core, for manual testing against
//! sample codestreams. Not part of the core per se (see `jxl`'s crate docs)
//! -- no colour management, no PNG encoding, just raw decoded samples.

use std::error::Error as StdError;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use jxl::Planes;

#[derive(Parser)]
#[command(name = "jxl-dec", about = "Decode a JPEG XL still image to raw planes")]
struct Args {
    /// Input codestream or container file.
    input: PathBuf,

    /// If given, write the decoded planes' raw samples (native-endian,
    /// channel-major) to this path instead of only reporting a summary.
    #[arg(long)]
    dump_raw: Option<PathBuf>,

    /// Increase log verbosity (`-v` debug, `-vv` trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let bytes = match std::fs::read(&args.input) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("jxl-dec: could not read {}: {err}", args.input.display());
            return ExitCode::from(2);
        }
    };

    let decoder = jxl::JxlDecoder::new();
    let decoded = match decoder.decode(&bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            eprintln!("jxl-dec: decode error: {err}");
            return ExitCode::from(exit_code_for(&err));
        }
    };

    println!(
        "{}x{}, {} frame(s)",
        decoded.image_header.size.width, decoded.image_header.size.height, decoded.frames.len()
    );
    for (idx, frame) in decoded.frames.iter().enumerate() {
        println!("  frame {idx}: {} plane(s)", frame.planes.len());
    }

    if let Some(path) = args.dump_raw {
        if let Err(err) = dump_raw(&decoded, &path) {
            eprintln!("jxl-dec: could not write {}: {err}", path.display());
            return ExitCode::from(2);
        }
    }

    ExitCode::from(0)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let _ = tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).try_init();
}

/// Maps a decode error to the exit-code taxonomy: 1 usage/decode, 2 I/O
/// (not reachable from here, `main` returns it directly), 3 allocation.
fn exit_code_for(err: &jxl::Error) -> u8 {
    if is_out_of_memory(err) {
        3
    } else {
        1
    }
}

fn is_out_of_memory(err: &(dyn StdError + 'static)) -> bool {
    if err.downcast_ref::<jxl_grid::Error>().is_some_and(|e| matches!(e, jxl_grid::Error::OutOfMemory(_))) {
        return true;
    }
    if let Some(source) = err.source() {
        return is_out_of_memory(source);
    }
    false
}

fn dump_raw(decoded: &jxl::DecodedImage, path: &std::path::Path) -> std::io::Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    for frame in &decoded.frames {
        match &frame.planes {
            Planes::Narrow(planes) => {
                for plane in planes {
                    for y in 0..plane.height() {
                        for x in 0..plane.width() {
                            out.write_all(&plane.get(x, y).to_le_bytes())?;
                        }
                    }
                }
            }
            Planes::Wide(planes) => {
                for plane in planes {
                    for y in 0..plane.height() {
                        for x in 0..plane.width() {
                            out.write_all(&plane.get(x, y).to_le_bytes())?;
                        }
                    }
                }
            }
        }
    }
    out.flush()
}
