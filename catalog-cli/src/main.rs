//! Cupcake Catalog CLI
//!
//! Repository tooling for the catalog: validate rulebook submissions and
//! regenerate the published index.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use catalog_core::{namespace, structure, GhReleaseSource, IndexBuilder, Severity};

#[derive(Parser, Debug)]
#[clap(
    name = "cupcake-catalog",
    about = "Validate and index Cupcake Catalog rulebooks",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a rulebook's manifest and structure
    Validate {
        /// Path to the rulebook directory
        rulebook: PathBuf,
    },

    /// Validate Rego package namespaces in a rulebook
    Namespace {
        /// Path to the rulebook directory
        rulebook: PathBuf,
    },

    /// Generate index.yaml from all rulebooks in the repository
    Index {
        /// Directory containing the rulebooks
        #[clap(long, default_value = "rulebooks")]
        rulebooks_dir: PathBuf,

        /// Where to write the generated index
        #[clap(long, default_value = "index.yaml")]
        output: PathBuf,
    },
}

const RULE: &str = "----------------------------------------";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Usage errors exit 1 like validation failures; --help/--version still
    // exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let result = match cli.command {
        Command::Validate { rulebook } => validate_command(&rulebook),
        Command::Namespace { rulebook } => namespace_command(&rulebook),
        Command::Index {
            rulebooks_dir,
            output,
        } => index_command(&rulebooks_dir, &output).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::from(1)
        }
    }
}

/// Require an existing directory, matching the validation commands' contract
fn require_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }
    if !path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", path.display());
    }
    Ok(())
}

fn rulebook_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn validate_command(rulebook: &Path) -> Result<bool> {
    require_dir(rulebook)?;

    println!("Validating rulebook: {}", rulebook_label(rulebook));
    println!("{RULE}");

    let report = structure::validate_rulebook(rulebook);

    for issue in &report.issues {
        match issue.severity {
            Severity::Warning => println!("WARNING: {issue}"),
            Severity::Error => println!("ERROR: {issue}"),
        }
    }

    println!("{RULE}");

    let (errors, warnings) = (report.error_count(), report.warning_count());
    if report.passed() {
        println!("PASSED: 0 errors, {warnings} warning(s)");
    } else {
        println!("FAILED: {errors} error(s), {warnings} warning(s)");
    }

    Ok(report.passed())
}

fn namespace_command(rulebook: &Path) -> Result<bool> {
    require_dir(rulebook)?;

    println!("Validating namespaces: {}", rulebook_label(rulebook));
    println!("{RULE}");

    let errors = namespace::validate_namespaces(rulebook);

    for error in &errors {
        println!("ERROR: {error}");
    }

    println!("{RULE}");

    if errors.is_empty() {
        println!("PASSED: All namespaces valid");
        Ok(true)
    } else {
        println!("FAILED: {} namespace violation(s)", errors.len());
        Ok(false)
    }
}

async fn index_command(rulebooks_dir: &Path, output: &Path) -> Result<bool> {
    println!("Generating catalog index...");

    let source = GhReleaseSource::new();
    let index = IndexBuilder::new(rulebooks_dir, &source).build().await?;
    index.write_to(output)?;

    println!(
        "Generated {} with {} rulebook(s), {} version(s)",
        output.display(),
        index.rulebook_count(),
        index.version_count()
    );

    Ok(true)
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from(["cupcake-catalog", "validate", "rulebooks/secure-git"])
            .unwrap();
        assert!(matches!(cli.command, Command::Validate { .. }));
    }

    #[test]
    fn test_validate_requires_path() {
        assert!(Cli::try_parse_from(["cupcake-catalog", "validate"]).is_err());
    }

    #[test]
    fn test_missing_argument_is_a_failure_exit() {
        // A missing positional is a usage error, reported on stderr and
        // mapped to exit code 1 in main
        let err = Cli::try_parse_from(["cupcake-catalog", "validate"]).unwrap_err();
        assert!(err.use_stderr());

        let err = Cli::try_parse_from(["cupcake-catalog", "frobnicate"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn test_help_and_version_are_not_failures() {
        let err = Cli::try_parse_from(["cupcake-catalog", "--help"]).unwrap_err();
        assert!(!err.use_stderr());

        let err = Cli::try_parse_from(["cupcake-catalog", "--version"]).unwrap_err();
        assert!(!err.use_stderr());
    }

    #[test]
    fn test_index_defaults() {
        let cli = Cli::try_parse_from(["cupcake-catalog", "index"]).unwrap();
        match cli.command {
            Command::Index {
                rulebooks_dir,
                output,
            } => {
                assert_eq!(rulebooks_dir, PathBuf::from("rulebooks"));
                assert_eq!(output, PathBuf::from("index.yaml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_require_dir_missing_path() {
        let err = require_dir(Path::new("/nonexistent/rulebook")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
