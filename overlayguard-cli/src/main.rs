//! OverlayGuard CLI - overlay catalog consistency checking from the
//! command line.

use clap::{Parser, Subcommand, ValueEnum};
use overlayguard::checker::{verify_catalog, CheckOutcome, OverrideChecker};
use overlayguard::{
    parse_dts_file, render_to_string, CheckOptions, CheckPaths, CheckResult, DtsKind,
};
use overlayguard::OverlayGuardCore;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "overlayguard")]
#[command(about = "Device tree overlay catalog consistency checker", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check README, Makefile, and compiled overlays against each other
    Check {
        /// Path to the overlay README
        #[arg(long, value_name = "FILE")]
        readme: PathBuf,

        /// Path to the overlay Makefile
        #[arg(long, value_name = "FILE")]
        makefile: Option<PathBuf>,

        /// Path to the permanent exclusion list
        #[arg(long, value_name = "FILE")]
        exclusions: Option<PathBuf>,

        /// Directory of compiled overlay dumps (*.dts)
        #[arg(long, value_name = "DIR")]
        dts_dir: Option<PathBuf>,

        /// Compiled base DTB dump; may be given multiple times
        #[arg(long = "base-dts", value_name = "FILE")]
        base_dts: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Ignore the exclusion list and report waived findings too
        #[arg(long)]
        strict: bool,

        /// Skip the Makefile completeness pass
        #[arg(long)]
        no_makefile: bool,

        /// External command run as `CMD <overlay> <param>` to verify each
        /// extracted override
        #[arg(long, value_name = "CMD")]
        verify_cmd: Option<String>,

        /// Skip external verification for overlays restricted to the
        /// newest hardware family
        #[arg(long)]
        skip_restricted: bool,
    },

    /// Print the overrides extracted from one compiled dump
    Params {
        /// Path to the compiled dump
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Treat the file as a base DTB dump rather than an overlay
        #[arg(long)]
        base: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable category listing ending in OK or Failed
    Human,
    /// JSON output for CI/CD
    Json,
    /// GitHub Actions annotation format
    Github,
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Check {
            readme,
            makefile,
            exclusions,
            dts_dir,
            base_dts,
            format,
            strict,
            no_makefile,
            verify_cmd,
            skip_restricted,
        } => handle_check(
            CheckPaths {
                readme,
                makefile,
                exclusions,
                dts_dir,
                base_dts,
            },
            format,
            strict,
            no_makefile,
            verify_cmd,
            skip_restricted,
        ),
        Commands::Params { file, base } => handle_params(&file, base),
    };

    process::exit(exit_code);
}

fn handle_check(
    paths: CheckPaths,
    format: OutputFormat,
    strict: bool,
    no_makefile: bool,
    verify_cmd: Option<String>,
    skip_restricted: bool,
) -> i32 {
    let options = CheckOptions {
        apply_exclusions: !strict,
        check_makefile: !no_makefile,
    };

    let mut result = match OverlayGuardCore::check_paths(&paths, &options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if let Some(program) = verify_cmd {
        let checker = CommandChecker { program };
        let skip: Vec<String> = if skip_restricted {
            result.restricted.iter().cloned().collect()
        } else {
            Vec::new()
        };
        let failures = verify_catalog(&checker, &result.source, &skip);
        result
            .report
            .add_violations("override verification", failures);
    }

    output_result(&result, &format);
    if result.report.passed() {
        0
    } else {
        1
    }
}

fn handle_params(file: &PathBuf, base: bool) -> i32 {
    let kind = if base { DtsKind::Base } else { DtsKind::Overlay };
    match parse_dts_file(file, kind) {
        Ok(info) => {
            for param in &info.params {
                println!("{}", param);
            }
            if info.restricted {
                println!("(restricted to the newest hardware family)");
            }
            for violation in &info.violations {
                eprintln!("{}: {}", file.display(), violation);
            }
            if info.violations.is_empty() {
                0
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn output_result(result: &CheckResult, format: &OutputFormat) {
    match format {
        OutputFormat::Human => print!("{}", render_to_string(&result.report)),
        OutputFormat::Json => output_json(result),
        OutputFormat::Github => output_github(result),
    }
}

fn output_json(result: &CheckResult) {
    let output = serde_json::json!({
        "report": result.report,
        "summary": {
            "findings": result.report.total_findings(),
            "passed": result.report.passed(),
            "restricted": result.restricted,
        }
    });
    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

fn output_github(result: &CheckResult) {
    for group in &result.report.violations {
        for violation in &group.items {
            match violation.line {
                Some(line) => println!(
                    "::error file={},line={}::{}",
                    group.source, line, violation.message
                ),
                None => println!("::error file={}::{}", group.source, violation.message),
            }
        }
    }
    let r = &result.report.reconciliation;
    for overlay in &r.undocumented_overlays {
        println!("::error::overlay '{}' has no documentation", overlay);
    }
    for overlay in &r.vestigial_docs {
        println!("::error::documentation for '{}' has no overlay", overlay);
    }
    for findings in &r.params {
        for param in &findings.undocumented {
            println!(
                "::error::parameter '{}' of '{}' is undocumented",
                param, findings.overlay
            );
        }
        for param in &findings.vestigial {
            println!(
                "::error::documented parameter '{}' of '{}' no longer exists",
                param, findings.overlay
            );
        }
    }
    for overlay in &r.missing_from_makefile {
        println!("::error::overlay '{}' is missing from the Makefile", overlay);
    }
    for overlay in &r.vestigial_makefile {
        println!("::error::Makefile entry '{}' has no overlay", overlay);
    }
}

/// Runs the user-supplied verification command once per override:
/// `program <overlay> <param>`. Non-zero exit means failure; stderr is the
/// diagnostic.
struct CommandChecker {
    program: String,
}

impl OverrideChecker for CommandChecker {
    fn name(&self) -> &str {
        &self.program
    }

    fn check_override(&self, overlay: &str, param: &str) -> CheckOutcome {
        match std::process::Command::new(&self.program)
            .arg(overlay)
            .arg(param)
            .output()
        {
            Ok(output) if output.status.success() => CheckOutcome::pass(),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                CheckOutcome::fail(stderr.trim().to_string())
            }
            Err(e) => CheckOutcome::fail(format!("failed to run '{}': {}", self.program, e)),
        }
    }
}
