//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.qannotate.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Filesystem layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Study/annotation-platform settings.
    #[serde(default)]
    pub study: StudyConfig,

    /// General application settings.
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Where input data, annotations, and the password file live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the generated datasets.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Directory receiving full-study annotation profiles.
    #[serde(default = "default_annotations_dir")]
    pub annotations_dir: PathBuf,

    /// Directory receiving preliminary-mode annotation profiles.
    #[serde(default = "default_preliminary_dir")]
    pub preliminary_annotations_dir: PathBuf,

    /// File holding the SHA-512 digest of the shared password.
    #[serde(default = "default_password_file")]
    pub password_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            annotations_dir: default_annotations_dir(),
            preliminary_annotations_dir: default_preliminary_dir(),
            password_file: default_password_file(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("data/generated_questions")
}

fn default_annotations_dir() -> PathBuf {
    PathBuf::from("data/annotations/full")
}

fn default_preliminary_dir() -> PathBuf {
    PathBuf::from("data/annotations/preliminary")
}

fn default_password_file() -> PathBuf {
    PathBuf::from("password")
}

/// Settings tied to the annotation campaign itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Completion code shown to annotators who finish the full study.
    #[serde(default)]
    pub completion_code: String,

    /// Completion code for preliminary mode.
    #[serde(default)]
    pub preliminary_completion_code: String,

    /// Name of the annotation management platform (shown in UI copy).
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Shuffle records per annotator (deterministic, username-seeded).
    /// Contexts stay contiguous; group order and in-group order change.
    #[serde(default)]
    pub shuffle: bool,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            completion_code: String::new(),
            preliminary_completion_code: String::new(),
            platform: default_platform(),
            shuffle: false,
        }
    }
}

fn default_platform() -> String {
    "Prolific".to_string()
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Log file path; the TUI owns the screen, so tracing writes here.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_file: default_log_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("qannotate.log")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".qannotate.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref input_dir) = args.input_dir {
            self.paths.input_dir = input_dir.clone();
        }
        if let Some(ref annotations_dir) = args.annotations_dir {
            self.paths.annotations_dir = annotations_dir.clone();
        }
        if let Some(ref preliminary_dir) = args.preliminary_dir {
            self.paths.preliminary_annotations_dir = preliminary_dir.clone();
        }
        if let Some(ref password_file) = args.password_file {
            self.paths.password_file = password_file.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
