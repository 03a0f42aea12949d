// SPDX-License-Identifier: AGPL-3.0-only

//! Bit-serial GEMM verification sweep.
//!
//! Draws random operand pairs, packs them, and checks the AND+popcount
//! engine against plain integer multiplication at every port width. Any
//! divergence prints the offending case and fails the run.
//!
//! ## Usage
//!
//!   cargo run --bin verify_gemm                      # 200 cases per width
//!   cargo run --bin verify_gemm -- --cases=1000
//!   cargo run --bin verify_gemm -- --seed=7 --word=w16 --verbose
//!   cargo run --bin verify_gemm -- --max-inner=300 --max-depth=16

use anyhow::Result;
use bitmill_layout::word::{WordSize, ALL_WORD_SIZES};
use bitmill_verify::{run_gemm_sweep, GemmSweepConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    let seed = args
        .iter()
        .find_map(|a| a.strip_prefix("--seed="))
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x5eed);
    let cases = args
        .iter()
        .find_map(|a| a.strip_prefix("--cases="))
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(200);
    let only_word = args
        .iter()
        .find_map(|a| a.strip_prefix("--word="))
        .map(|s| s.parse::<WordSize>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let max_inner = args
        .iter()
        .find_map(|a| a.strip_prefix("--max-inner="))
        .and_then(|s| s.parse::<usize>().ok());
    let max_depth = args
        .iter()
        .find_map(|a| a.strip_prefix("--max-depth="))
        .and_then(|s| s.parse::<usize>().ok());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  bitmill — bit-serial GEMM verification sweep                ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Seed: {seed:#x}   Cases per port width: {cases}");
    println!();

    let words: Vec<WordSize> = match only_word {
        Some(w) => vec![w],
        None => ALL_WORD_SIZES.to_vec(),
    };

    // ── Sweeps ────────────────────────────────────────────────────────────────

    let mut failed = 0usize;
    for word in words {
        let mut config = GemmSweepConfig::new(seed, cases, word);
        if let Some(inner) = max_inner {
            config.max_inner = inner;
        }
        if let Some(depth) = max_depth {
            config.max_bit_depth = depth;
        }
        let label = format!("GEMM packed vs direct @ {word}");
        print!("  {label:<50} ");
        let report = run_gemm_sweep(&config)?;
        if report.passed() {
            println!("✓ PASS ({} cases)", report.cases);
            if verbose {
                println!(
                    "         bounds: output ≤{0}x{0}, inner ≤{1}, depth ≤{2} bits",
                    config.max_dim, config.max_inner, config.max_bit_depth
                );
            }
        } else {
            println!("✗ FAIL ({}/{} mismatched)", report.mismatches, report.cases);
            if let Some(m) = &report.first_mismatch {
                println!("         case {}: {}", m.case, m.detail);
            }
            failed += 1;
        }
    }

    // ── Summary ───────────────────────────────────────────────────────────────

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if failed == 0 {
        println!("All port widths clean ✓");
    } else {
        println!("VERIFICATION FAILED — {failed} port width(s) diverged");
        std::process::exit(1);
    }
    Ok(())
}
