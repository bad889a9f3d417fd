//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::dataset::RunMode;
use clap::Parser;
use std::path::PathBuf;

/// QAnnotate - terminal annotation tool for generated QA datasets
///
/// Presents machine-generated question/answer pairs to a human annotator
/// one at a time and persists the judgments to per-user JSON files.
///
/// Examples:
///   qannotate
///   qannotate --subset 3
///   qannotate --preliminary --insecure
///   qannotate --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Use the preliminary dataset and output paths
    ///
    /// Reads preliminary_generated_data.json and writes profiles under the
    /// preliminary annotations directory. Mutually exclusive with --subset.
    #[arg(long, conflicts_with = "subset")]
    pub preliminary: bool,

    /// Index of the dataset subset to annotate
    ///
    /// Reads subset_<N>_generated_data.json and nests profiles under a
    /// per-subset directory. If omitted, the full dataset is used.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub subset: Option<u32>,

    /// Skip the password check
    ///
    /// Without this flag a password file must exist; annotators are asked
    /// for the passphrase before anything else is shown.
    #[arg(long)]
    pub insecure: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .qannotate.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the generated datasets
    #[arg(long, value_name = "DIR", env = "QANNOTATE_INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving full-study annotation profiles
    #[arg(long, value_name = "DIR", env = "QANNOTATE_ANNOTATIONS_DIR")]
    pub annotations_dir: Option<PathBuf>,

    /// Directory receiving preliminary-mode annotation profiles
    #[arg(long, value_name = "DIR", env = "QANNOTATE_PRELIMINARY_DIR")]
    pub preliminary_dir: Option<PathBuf>,

    /// Path to the password digest file
    #[arg(long, value_name = "FILE")]
    pub password_file: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .qannotate.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// List known annotator profiles for the selected mode and exit
    #[arg(long)]
    pub list_users: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// clap already rejects --preliminary with --subset and out-of-range
    /// subset indices; the re-check here keeps the invariant even for
    /// hand-built Args in tests.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.preliminary && self.subset.is_some() {
            return Err("--preliminary cannot be combined with --subset".to_string());
        }

        if let Some(subset) = self.subset {
            if !(1..=100).contains(&subset) {
                return Err("Subset index must be between 1 and 100".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// The run mode selected by the flags.
    pub fn run_mode(&self) -> RunMode {
        if self.preliminary {
            RunMode::Preliminary
        } else if let Some(subset) = self.subset {
            RunMode::Subset(subset)
        } else {
            RunMode::Full
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            preliminary: false,
            subset: None,
            insecure: false,
            config: None,
            input_dir: None,
            annotations_dir: None,
            preliminary_dir: None,
            password_file: None,
            verbose: false,
            quiet: false,
            init_config: false,
            list_users: false,
        }
    }

    #[test]
    fn test_validation_rejects_preliminary_with_subset() {
        let mut args = make_args();
        args.preliminary = true;
        args.subset = Some(2);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_clap_rejects_preliminary_with_subset() {
        let result = Args::try_parse_from(["qannotate", "--preliminary", "--subset", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_clap_rejects_out_of_range_subset() {
        assert!(Args::try_parse_from(["qannotate", "--subset", "0"]).is_err());
        assert!(Args::try_parse_from(["qannotate", "--subset", "101"]).is_err());
        assert!(Args::try_parse_from(["qannotate", "--subset", "100"]).is_ok());
    }

    #[test]
    fn test_validation_conflicting_verbosity() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_run_mode_selection() {
        let mut args = make_args();
        assert_eq!(args.run_mode(), RunMode::Full);

        args.subset = Some(7);
        assert_eq!(args.run_mode(), RunMode::Subset(7));

        args.subset = None;
        args.preliminary = true;
        assert_eq!(args.run_mode(), RunMode::Preliminary);
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
