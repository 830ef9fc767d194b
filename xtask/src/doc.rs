use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

/// Rustdoc output for the driver crate under a cargo target directory.
fn index_path(target_dir: Option<&Path>) -> PathBuf {
    target_dir
        .unwrap_or_else(|| Path::new("target"))
        .join("doc")
        .join("xspi")
        .join("index.html")
}

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📖 Documenting xspi (defmt enabled)".cyan().bold());
    println!();

    let start = Instant::now();

    // Broken intra-doc links between the register and driver layers fail the build.
    let mut rustdoc = Command::new("cargo");
    rustdoc
        .args(["doc", "-p", "xspi", "--no-deps", "--features", "defmt"])
        .env("RUSTDOCFLAGS", "-D warnings");
    if open {
        rustdoc.arg("--open");
    }

    let output = rustdoc.output().context("Failed to run cargo doc")?;
    if !output.status.success() {
        eprintln!("{}", "  ✗ rustdoc reported errors".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("cargo doc failed");
    }

    let target_dir = std::env::var_os("CARGO_TARGET_DIR").map(PathBuf::from);
    let index = index_path(target_dir.as_deref());
    if !index.is_file() {
        anyhow::bail!("cargo doc succeeded but {} is missing", index.display());
    }

    println!(
        "{}",
        format!("  ✓ Docs ready in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    if !open {
        println!("    {}", index.display().to_string().dimmed());
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_defaults_to_workspace_target() {
        assert_eq!(index_path(None), Path::new("target/doc/xspi/index.html"));
    }

    #[test]
    fn index_follows_cargo_target_dir() {
        let custom = Path::new("/tmp/build");
        assert_eq!(
            index_path(Some(custom)),
            Path::new("/tmp/build/doc/xspi/index.html")
        );
    }
}
