//! `bitmill` — command-line interface for the bitplane codec.
//!
//! ```text
//! USAGE:
//!   bitmill geometry --rows N --cols M [--bit-depth D] [--word wN]
//!                                    Print the packed layout for a shape
//!   bitmill dump [--rows N --cols M ...] [--out FILE]
//!                                    Pack a generated matrix; write planes
//!   bitmill verify-gemm [--seed S --cases N --word wN]
//!                                    Random GEMM parity sweep
//!   bitmill verify-conv [--seed S --cases N --word wN]
//!                                    Random convolution parity sweep
//! ```

use std::path::PathBuf;

use anyhow::Result;
use bitmill_codec::{BitplaneCodec, Matrix, Signedness};
use bitmill_engine::source::matrix_from;
use bitmill_engine::{OperandSource, RampSource, XoshiroSource};
use bitmill_layout::limits::{depth_in_range, MAX_BIT_DEPTH};
use bitmill_layout::word::{WordSize, ALL_WORD_SIZES};
use bitmill_verify::{run_conv_sweep, run_gemm_sweep, ConvSweepConfig, GemmSweepConfig, SweepReport};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bitmill", about = "Bitplane codec and verification CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the packed plane layout for a matrix shape.
    Geometry {
        /// Matrix rows.
        #[arg(long)]
        rows: usize,
        /// Matrix columns.
        #[arg(long)]
        cols: usize,
        /// Bitplanes per element.
        #[arg(long, default_value_t = 8)]
        bit_depth: usize,
        /// Port width (w8, w16, w32, or w64).
        #[arg(long, default_value_t = WordSize::W64)]
        word: WordSize,
    },
    /// Generate a matrix, pack it, and report (or write) the planes.
    Dump {
        /// Matrix rows.
        #[arg(long, default_value_t = 8)]
        rows: usize,
        /// Matrix columns.
        #[arg(long, default_value_t = 8)]
        cols: usize,
        /// Bitplanes per element.
        #[arg(long, default_value_t = 8)]
        bit_depth: usize,
        /// Port width (w8, w16, w32, or w64).
        #[arg(long, default_value_t = WordSize::W64)]
        word: WordSize,
        /// Pack all-positive values instead of two's-complement.
        #[arg(long)]
        unsigned: bool,
        /// Seed for the random fill.
        #[arg(long, default_value_t = 0x5eed)]
        seed: u64,
        /// Fill with the deterministic ramp instead of random draws.
        #[arg(long)]
        ramp: bool,
        /// Write the serialized planes to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the randomized GEMM parity sweep.
    VerifyGemm {
        /// Seed for the operand stream.
        #[arg(long, default_value_t = 0x5eed)]
        seed: u64,
        /// Cases per port width.
        #[arg(long, default_value_t = 200)]
        cases: usize,
        /// Restrict the sweep to one port width.
        #[arg(long)]
        word: Option<WordSize>,
    },
    /// Run the randomized convolution parity sweep.
    VerifyConv {
        /// Seed for the operand stream.
        #[arg(long, default_value_t = 0xc011)]
        seed: u64,
        /// Cases per port width.
        #[arg(long, default_value_t = 100)]
        cases: usize,
        /// Restrict the sweep to one port width.
        #[arg(long)]
        word: Option<WordSize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Geometry {
            rows,
            cols,
            bit_depth,
            word,
        } => cmd_geometry(rows, cols, bit_depth, word)?,
        Cmd::Dump {
            rows,
            cols,
            bit_depth,
            word,
            unsigned,
            seed,
            ramp,
            out,
        } => cmd_dump(rows, cols, bit_depth, word, unsigned, seed, ramp, out.as_deref())?,
        Cmd::VerifyGemm { seed, cases, word } => cmd_verify_gemm(seed, cases, word)?,
        Cmd::VerifyConv { seed, cases, word } => cmd_verify_conv(seed, cases, word)?,
    }

    Ok(())
}

fn check_depth_arg(bit_depth: usize) -> Result<()> {
    anyhow::ensure!(
        depth_in_range(bit_depth),
        "bit depth {bit_depth} out of range (1..={MAX_BIT_DEPTH})"
    );
    Ok(())
}

fn cmd_geometry(rows: usize, cols: usize, bit_depth: usize, word: WordSize) -> Result<()> {
    check_depth_arg(bit_depth)?;
    anyhow::ensure!(rows > 0 && cols > 0, "rows and cols must be nonzero");

    let m = Matrix::zeroed(rows, cols, bit_depth, Signedness::Signed)?;
    let g = m.geometry(word);

    println!("Shape         : {rows} x {cols}");
    println!("Bit depth     : {bit_depth}");
    println!("Port width    : {word} ({} bytes per word on the wire)", word.bytes());
    println!("Words per row : {}", g.words_per_row());
    println!("Padding bits  : {} per row", g.padding_bits());
    println!("Words / plane : {}", g.words_per_plane());
    println!("Total words   : {}", g.total_words());
    println!("Wire bytes    : {}", g.wire_bytes());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_dump(
    rows: usize,
    cols: usize,
    bit_depth: usize,
    word: WordSize,
    unsigned: bool,
    seed: u64,
    ramp: bool,
    out: Option<&std::path::Path>,
) -> Result<()> {
    check_depth_arg(bit_depth)?;
    let signedness = if unsigned {
        Signedness::Unsigned
    } else {
        Signedness::Signed
    };

    let mut ramp_source = RampSource::new();
    let mut random_source = XoshiroSource::new(seed);
    let source: &mut dyn OperandSource = if ramp {
        &mut ramp_source
    } else {
        &mut random_source
    };
    let matrix = matrix_from(source, rows, cols, bit_depth, signedness)?;

    let codec = BitplaneCodec::new(word);
    let packed = codec.pack(&matrix)?;
    let g = packed.geometry();

    println!(
        "Packed {rows}x{cols} {signedness} matrix, {bit_depth} planes @ {word} \
         ({} words, {} wire bytes)",
        g.total_words(),
        g.wire_bytes()
    );
    println!();
    println!("  Plane   Weight        Set bits");
    println!("  {}", "─".repeat(34));
    for d in 0..bit_depth {
        let weight: i64 = if d + 1 == bit_depth && signedness == Signedness::Signed {
            -(1i64 << d)
        } else {
            1i64 << d
        };
        let set: u32 = (0..rows)
            .flat_map(|r| packed.row_words(d, r))
            .map(|w| w.count_ones())
            .sum();
        println!("  {d:>5}   {weight:>+6}        {set:>8}");
    }

    if let Some(path) = out {
        let bytes = packed.wire_bytes();
        std::fs::write(path, &bytes)?;
        println!();
        println!("Wrote {} bytes to {}", bytes.len(), path.display());
    }

    Ok(())
}

fn sweep_words(only: Option<WordSize>) -> Vec<WordSize> {
    match only {
        Some(w) => vec![w],
        None => ALL_WORD_SIZES.to_vec(),
    }
}

fn report_row(label: &str, report: &SweepReport) -> bool {
    if report.passed() {
        println!("  {label:<44} ok ({} cases)", report.cases);
        true
    } else {
        println!(
            "  {label:<44} FAILED ({}/{} mismatched)",
            report.mismatches, report.cases
        );
        if let Some(m) = &report.first_mismatch {
            println!("      case {}: {}", m.case, m.detail);
        }
        false
    }
}

fn cmd_verify_gemm(seed: u64, cases: usize, word: Option<WordSize>) -> Result<()> {
    println!("GEMM parity sweep  (seed {seed:#x}, {cases} cases per width)");
    let mut failed = 0usize;
    for w in sweep_words(word) {
        let report = run_gemm_sweep(&GemmSweepConfig::new(seed, cases, w))?;
        if !report_row(&format!("packed vs direct @ {w}"), &report) {
            failed += 1;
        }
    }
    anyhow::ensure!(failed == 0, "{failed} port width(s) diverged");
    Ok(())
}

fn cmd_verify_conv(seed: u64, cases: usize, word: Option<WordSize>) -> Result<()> {
    println!("Convolution parity sweep  (seed {seed:#x}, {cases} cases per width)");
    let mut failed = 0usize;
    for w in sweep_words(word) {
        let report = run_conv_sweep(&ConvSweepConfig::new(seed, cases, w))?;
        if !report_row(&format!("packed vs direct @ {w}"), &report) {
            failed += 1;
        }
    }
    anyhow::ensure!(failed == 0, "{failed} port width(s) diverged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitmill_codec::PackedMatrix;
    use tempfile::TempDir;

    #[test]
    fn dumped_wire_file_reloads_into_the_same_planes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("planes.bin");

        let mut source = RampSource::new();
        let matrix = matrix_from(&mut source, 5, 9, 6, Signedness::Signed).unwrap();
        let codec = BitplaneCodec::new(WordSize::W16);
        let packed = codec.pack(&matrix).unwrap();
        std::fs::write(&path, packed.wire_bytes()).unwrap();

        let data = std::fs::read(&path).unwrap();
        let reloaded =
            PackedMatrix::from_wire_bytes(packed.geometry(), packed.signedness(), &data).unwrap();
        assert_eq!(reloaded, packed);
        assert_eq!(codec.unpack(&reloaded), matrix);
    }

    #[test]
    fn depth_argument_is_validated() {
        assert!(check_depth_arg(8).is_ok());
        assert!(check_depth_arg(0).is_err());
        assert!(check_depth_arg(MAX_BIT_DEPTH + 1).is_err());
    }
}
