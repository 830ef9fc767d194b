use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Run a `cargo test` variant and print its summary line.
fn run_suite(label: &str, args: &[&str]) -> Result<()> {
    println!("{}", format!("  Running {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {label}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {label} failed").red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {}", line);
        }
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("{label} failed");
    }

    println!(
        "{}",
        format!(
            "  ✓ {label} passed {} in {:.2}s",
            total_summary(&stdout),
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    if !integration_only {
        run_suite("unit tests", &["test", "-p", "xspi", "--lib"])?;
    }

    if !unit_only {
        // tests/*.rs: sequencing, bus traits and proptest invariants.
        run_suite("integration tests", &["test", "-p", "xspi", "--tests"])?;
    }

    if !unit_only && !integration_only {
        run_suite("doc tests", &["test", "-p", "xspi", "--doc"])?;
    }

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

/// Sum the "N passed" counts over every test binary in `output`.
fn total_summary(output: &str) -> String {
    let mut passed = 0u64;
    let mut binaries = 0u64;
    for line in output.lines() {
        let Some(result) = line.split("test result:").nth(1) else {
            continue;
        };
        binaries = binaries.saturating_add(1);
        let count = result
            .split(';')
            .find_map(|part| part.trim().strip_suffix(" passed"))
            .and_then(|n| n.rsplit(' ').next())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);
        passed = passed.saturating_add(count);
    }
    if binaries == 0 {
        "(summary not available)".to_string()
    } else {
        format!("({passed} passed across {binaries} binaries)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_sums_all_binaries() {
        let output = "\
test result: ok. 12 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out
test result: ok. 3 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out
";
        assert_eq!(total_summary(output), "(15 passed across 2 binaries)");
    }

    #[test]
    fn summary_without_results() {
        assert_eq!(total_summary("compiling..."), "(summary not available)");
    }
}
