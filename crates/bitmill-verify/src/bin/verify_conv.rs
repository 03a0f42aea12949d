// SPDX-License-Identifier: AGPL-3.0-only

//! Convolution verification sweep.
//!
//! Random images and filter banks go through the packed pipeline (bitplane
//! pack, window extraction, AND+popcount accumulate) and through the plain
//! sliding-window reference; the feature maps must match cell for cell.
//! Also pins the pixel-mode extractor: 1x1 windows at stride 1 must copy
//! the image unchanged.
//!
//! ## Usage
//!
//!   cargo run --bin verify_conv                      # 100 cases per width
//!   cargo run --bin verify_conv -- --cases=400 --verbose
//!   cargo run --bin verify_conv -- --seed=9 --word=w8 --max-depth=12

use anyhow::Result;
use bitmill_layout::word::{WordSize, ALL_WORD_SIZES};
use bitmill_verify::{run_conv_sweep, run_window_identity_sweep, ConvSweepConfig, SweepReport};
use tracing_subscriber::EnvFilter;

fn print_row(label: &str, report: &SweepReport, failed: &mut usize) {
    print!("  {label:<50} ");
    if report.passed() {
        println!("✓ PASS ({} cases)", report.cases);
    } else {
        println!("✗ FAIL ({}/{} mismatched)", report.mismatches, report.cases);
        if let Some(m) = &report.first_mismatch {
            println!("         case {}: {}", m.case, m.detail);
        }
        *failed += 1;
    }
}

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
        .unwrap_or(0xc0_11);
    let cases = args
        .iter()
        .find_map(|a| a.strip_prefix("--cases="))
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(100);
    let only_word = args
        .iter()
        .find_map(|a| a.strip_prefix("--word="))
        .map(|s| s.parse::<WordSize>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let max_depth = args
        .iter()
        .find_map(|a| a.strip_prefix("--max-depth="))
        .and_then(|s| s.parse::<usize>().ok());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  bitmill — convolution verification sweep                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Seed: {seed:#x}   Cases per port width: {cases}");
    println!();

    let words: Vec<WordSize> = match only_word {
        Some(w) => vec![w],
        None => ALL_WORD_SIZES.to_vec(),
    };

    // ── Packed vs direct convolution ──────────────────────────────────────────

    let mut failed = 0usize;
    for word in words {
        let mut config = ConvSweepConfig::new(seed, cases, word);
        if let Some(depth) = max_depth {
            config.max_bit_depth = depth;
        }
        let report = run_conv_sweep(&config)?;
        print_row(&format!("conv packed vs direct @ {word}"), &report, &mut failed);
        if verbose && report.passed() {
            println!(
                "         bounds: window ≤{}x{}, stride ≤{}, grid ≤{}x{} steps, \
                 {} in / {} out channels, depth ≤{} bits",
                config.max_window,
                config.max_window,
                config.max_stride,
                config.max_steps,
                config.max_steps,
                config.max_channels,
                config.max_out_channels,
                config.max_bit_depth
            );
        }
    }

    // ── Pixel-mode identity ───────────────────────────────────────────────────

    let report = run_window_identity_sweep(seed, cases)?;
    print_row("pixel windows at 1x1 stride 1", &report, &mut failed);

    // ── Summary ───────────────────────────────────────────────────────────────

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if failed == 0 {
        println!("All checks clean ✓");
    } else {
        println!("VERIFICATION FAILED — {failed} check(s) diverged");
        std::process::exit(1);
    }
    Ok(())
}
