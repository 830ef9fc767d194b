use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// AVR part the cross-check compiles for.
const AVR_CPU: &str = "atxmega128a1";

/// Outcome of a check that may only warn.
enum Severity {
    Fail,
    Warn,
}

fn cargo(args: &[&str]) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(args);
    cmd
}

/// Run one check and report it. Returns `Ok(false)` for a tolerated warning.
fn step(label: &str, mut cmd: Command, severity: Severity) -> Result<bool> {
    println!("{}", format!("  {label}...").cyan());
    let start = Instant::now();

    let output: Output = cmd
        .output()
        .with_context(|| format!("Failed to run {label}"))?;

    if output.status.success() {
        println!(
            "{}",
            format!("  ✓ {label} passed in {:.2}s", start.elapsed().as_secs_f64()).green()
        );
        println!();
        return Ok(true);
    }

    match severity {
        Severity::Fail => {
            eprintln!("{}", format!("  ✗ {label} failed").red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{label} failed");
        }
        Severity::Warn => {
            eprintln!("{}", format!("  ⚠ {label} reported issues").yellow().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            println!();
            Ok(false)
        }
    }
}

pub fn run(host_only: bool) -> Result<()> {
    println!();
    println!("{}", "🔍 Checking xspi...".cyan().bold());
    println!();

    let total_start = Instant::now();

    // Host: plain and with defmt derives compiled in.
    step("Host check", cargo(&["check", "-p", "xspi", "--all-targets"]), Severity::Fail)?;
    step(
        "Host check (defmt)",
        cargo(&["check", "-p", "xspi", "--features", "defmt"]),
        Severity::Fail,
    )?;

    // AVR: no prebuilt std for avr-none, so core is built from source.
    if host_only {
        println!("{}", "  ⚠ Skipping AVR check (--host-only)".yellow());
        println!();
    } else {
        let mut avr = Command::new("cargo");
        avr.args([
            "+nightly",
            "check",
            "-p",
            "xspi",
            "--target",
            "avr-none",
            "-Zbuild-std=core",
        ])
        .env("RUSTFLAGS", format!("-C target-cpu={AVR_CPU}"));
        step(&format!("AVR check ({AVR_CPU})"), avr, Severity::Fail)?;
    }

    step(
        "Clippy",
        cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]),
        Severity::Warn,
    )?;

    if !step("Formatting", cargo(&["fmt", "--all", "--check"]), Severity::Warn)? {
        eprintln!("     Run 'cargo fmt --all' to fix");
        println!();
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
