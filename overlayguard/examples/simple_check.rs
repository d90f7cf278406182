//! Simple check example: reconcile a catalog tree and print the report.

use anyhow::Context;
use overlayguard::prelude::*;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/clean"));

    if !root.exists() {
        eprintln!("Directory not found: {}", root.display());
        eprintln!("Usage: cargo run --example simple_check [path/to/catalog]");
        std::process::exit(1);
    }

    let paths = CheckPaths {
        readme: root.join("README"),
        makefile: Some(root.join("Makefile")),
        exclusions: root.join("exclusions").exists().then(|| root.join("exclusions")),
        dts_dir: Some(root.join("overlays")),
        base_dts: vec![root.join("base.dts")],
    };

    let result = OverlayGuardCore::check_paths(&paths, &CheckOptions::default())
        .with_context(|| format!("checking catalog under {}", root.display()))?;

    print!("{}", overlayguard::render_to_string(&result.report));
    println!();
    println!("Total findings: {}", result.report.total_findings());
    for overlay in &result.restricted {
        println!("Restricted to the newest family: {}", overlay);
    }

    if !result.report.passed() {
        std::process::exit(1);
    }
    Ok(())
}
