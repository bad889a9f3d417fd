//! Per-user profile storage.
//!
//! Each annotator owns one directory under the annotations root:
//!
//! ```text
//! <annotations root>[/<subset>]/<username>/
//!     profile.json              kept pairs (the primary record)
//!     profile.squad             SQuAD v2 rendition of the kept pairs
//!     unsuitable_questions.json context -> rejected questions
//!     unnatural_texts.json      questions/answers judged unnatural
//!     incorrect.json            question/answer pairs judged incorrect
//!     times.json                per-page and per-pair timing
//!     notes.json                free-text judgment explanations
//!     complete                  empty marker, written once the user finishes
//! ```
//!
//! Only that annotator's session writes to the directory; the tool does not
//! arbitrate concurrent writers.

use crate::config::PathsConfig;
use crate::dataset::RunMode;
use crate::export;
use crate::models::{Annotation, Notes, Times, UnsuitableMap};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const PROFILE_FILE: &str = "profile.json";
const SQUAD_FILE: &str = "profile.squad";
const UNSUITABLE_FILE: &str = "unsuitable_questions.json";
const UNNATURAL_FILE: &str = "unnatural_texts.json";
const INCORRECT_FILE: &str = "incorrect.json";
const TIMES_FILE: &str = "times.json";
const NOTES_FILE: &str = "notes.json";
const COMPLETE_MARKER: &str = "complete";

/// Resolved directory layout for one run mode.
#[derive(Debug, Clone)]
pub struct DataLayout {
    /// Directory holding the generated datasets.
    pub input_dir: PathBuf,
    /// Annotation output root (already preliminary-resolved).
    pub annotations_root: PathBuf,
    /// Subset index, nesting profiles one level deeper.
    pub subset: Option<u32>,
}

impl DataLayout {
    /// Resolve the layout for a run mode from the configured paths.
    pub fn new(paths: &PathsConfig, mode: RunMode) -> Self {
        let annotations_root = match mode {
            RunMode::Preliminary => paths.preliminary_annotations_dir.clone(),
            _ => paths.annotations_dir.clone(),
        };

        Self {
            input_dir: paths.input_dir.clone(),
            annotations_root,
            subset: mode.subset_index(),
        }
    }

    /// Directory under which user profile directories live.
    pub fn profiles_root(&self) -> PathBuf {
        match self.subset {
            Some(index) => self.annotations_root.join(index.to_string()),
            None => self.annotations_root.clone(),
        }
    }

    /// One user's profile directory. Does not ensure it exists.
    pub fn user_dir(&self, username: &str) -> PathBuf {
        self.profiles_root().join(username)
    }
}

/// Everything a session persists for one annotator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    /// Accumulated annotations, append-only.
    pub kept_pairs: Vec<Annotation>,
    /// Questions judged unsuitable, by context.
    pub unsuitable: UnsuitableMap,
    /// Timing data.
    pub times: Times,
    /// Judgment explanations.
    pub notes: Notes,
}

/// Reads and writes one annotator's profile directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    user_dir: PathBuf,
}

impl ProfileStore {
    /// Create a store for one user. Does not touch the filesystem.
    pub fn new(layout: &DataLayout, username: &str) -> Self {
        Self {
            user_dir: layout.user_dir(username),
        }
    }

    /// The user's profile directory.
    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.user_dir.join(file)
    }

    /// Whether a profile has been initialised for this user.
    pub fn exists(&self) -> bool {
        self.path(PROFILE_FILE).is_file()
    }

    /// Initialise an empty profile. Does nothing if the user already exists.
    pub fn init_user(&self) -> Result<()> {
        if self.exists() {
            warn!(
                "Profile already exists at {}, not remaking",
                self.user_dir.display()
            );
            return Ok(());
        }

        std::fs::create_dir_all(&self.user_dir).with_context(|| {
            format!("Failed to create profile directory: {}", self.user_dir.display())
        })?;

        write_json_pretty(&self.path(PROFILE_FILE), &Vec::<Annotation>::new())?;
        info!("Created profile at {}", self.user_dir.display());
        Ok(())
    }

    /// Load the profile. The kept-pairs file must exist; the side files are
    /// treated as empty when absent.
    pub fn load(&self) -> Result<UserProfile> {
        let kept_pairs: Vec<Annotation> = read_json(&self.path(PROFILE_FILE))?;

        Ok(UserProfile {
            kept_pairs,
            unsuitable: read_json_or_default(&self.path(UNSUITABLE_FILE))?,
            times: read_json_or_default(&self.path(TIMES_FILE))?,
            notes: read_json_or_default(&self.path(NOTES_FILE))?,
        })
    }

    /// Persist the profile, rewriting every output file including the SQuAD
    /// rendition and the unnatural/incorrect side channels.
    pub fn save(&self, profile: &UserProfile) -> Result<()> {
        let bundle = export::export_annotations(&profile.kept_pairs);

        write_json_pretty(&self.path(PROFILE_FILE), &profile.kept_pairs)?;
        write_json_pretty(&self.path(SQUAD_FILE), &bundle.squad)?;
        write_json_pretty(&self.path(UNNATURAL_FILE), &bundle.unnatural)?;
        write_json_pretty(&self.path(UNSUITABLE_FILE), &profile.unsuitable)?;
        write_json_pretty(&self.path(INCORRECT_FILE), &bundle.incorrect)?;
        write_json_pretty(&self.path(TIMES_FILE), &profile.times)?;
        write_json_pretty(&self.path(NOTES_FILE), &profile.notes)?;

        Ok(())
    }

    /// Persist only the timing data (used while paging through calibration).
    pub fn save_times(&self, times: &Times) -> Result<()> {
        write_json_pretty(&self.path(TIMES_FILE), times)
    }

    /// Mark the user as having completed the study.
    pub fn mark_complete(&self) -> Result<()> {
        std::fs::write(self.path(COMPLETE_MARKER), b"").with_context(|| {
            format!(
                "Failed to write completion marker in {}",
                self.user_dir.display()
            )
        })
    }

    /// Whether the user has completed the study.
    pub fn is_complete(&self) -> bool {
        self.path(COMPLETE_MARKER).is_file()
    }
}

/// List usernames with a profile under the layout's profiles root.
///
/// Scans `<profiles root>/<username>/profile.json`, two levels deep, so
/// stray files and deeper directories are ignored.
pub fn list_users(layout: &DataLayout) -> Vec<String> {
    let root = layout.profiles_root();
    let mut users = Vec::new();

    for entry in WalkDir::new(&root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && entry.file_name() == PROFILE_FILE {
            if let Some(username) = entry
                .path()
                .parent()
                .and_then(|dir| dir.file_name())
                .and_then(|name| name.to_str())
            {
                users.push(username.to_string());
            }
        }
    }

    users.sort();
    users
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.is_file() {
        read_json(path)
    } else {
        Ok(T::default())
    }
}

fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialise {}", path.display()))?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoteEntry, SquadDataset};
    use chrono::Utc;

    fn layout(root: &Path, subset: Option<u32>) -> DataLayout {
        DataLayout {
            input_dir: root.join("input"),
            annotations_root: root.join("annotations"),
            subset,
        }
    }

    fn annotation() -> Annotation {
        Annotation {
            context: "The quick brown fox jumps over the lazy dog.".to_string(),
            question: "What does the fox jump over?".to_string(),
            answer: "the lazy dog".to_string(),
            question_natural: true,
            answer_natural: true,
            answer_adequate: true,
            answer_precise: true,
            user_question: "What does the fox jump over?".to_string(),
            user_answer: "the lazy dog".to_string(),
            annotated_at: Utc::now(),
        }
    }

    #[test]
    fn test_layout_resolves_preliminary_root() {
        let paths = PathsConfig::default();

        let full = DataLayout::new(&paths, RunMode::Full);
        assert_eq!(full.annotations_root, paths.annotations_dir);
        assert_eq!(full.subset, None);

        let preliminary = DataLayout::new(&paths, RunMode::Preliminary);
        assert_eq!(
            preliminary.annotations_root,
            paths.preliminary_annotations_dir
        );
    }

    #[test]
    fn test_layout_nests_subset_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path(), Some(3));

        assert_eq!(
            layout.user_dir("alice"),
            dir.path().join("annotations").join("3").join("alice")
        );
    }

    #[test]
    fn test_init_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path(), None);
        let store = ProfileStore::new(&layout, "alice");

        assert!(!store.exists());
        store.init_user().unwrap();
        assert!(store.exists());

        let empty = store.load().unwrap();
        assert!(empty.kept_pairs.is_empty());

        let mut profile = UserProfile::default();
        profile.kept_pairs.push(annotation());
        profile
            .unsuitable
            .entry("some context".to_string())
            .or_default()
            .push("bad question".to_string());
        profile.times.questions.insert(0, 31.5);
        profile
            .notes
            .entry("some context".to_string())
            .or_default()
            .insert(
                "bad question".to_string(),
                NoteEntry {
                    question: Some("makes no sense".to_string()),
                    answer: None,
                },
            );

        store.save(&profile).unwrap();
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, profile);
    }

    #[test]
    fn test_init_user_does_not_clobber_existing_profile() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path(), None);
        let store = ProfileStore::new(&layout, "alice");

        store.init_user().unwrap();
        let mut profile = UserProfile::default();
        profile.kept_pairs.push(annotation());
        store.save(&profile).unwrap();

        store.init_user().unwrap();
        assert_eq!(store.load().unwrap().kept_pairs.len(), 1);
    }

    #[test]
    fn test_save_writes_parseable_squad_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path(), None);
        let store = ProfileStore::new(&layout, "alice");
        store.init_user().unwrap();

        let mut profile = UserProfile::default();
        profile.kept_pairs.push(annotation());
        store.save(&profile).unwrap();

        let squad_path = store.user_dir().join("profile.squad");
        let squad: SquadDataset =
            serde_json::from_str(&std::fs::read_to_string(squad_path).unwrap()).unwrap();
        assert_eq!(squad.version, "v2.0");
        assert_eq!(squad.data[0].paragraphs.len(), 1);
    }

    #[test]
    fn test_completion_marker_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path(), None);
        let store = ProfileStore::new(&layout, "alice");
        store.init_user().unwrap();

        assert!(!store.is_complete());
        store.mark_complete().unwrap();
        assert!(store.is_complete());
    }

    #[test]
    fn test_list_users_finds_profiles_only() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path(), None);

        for name in ["carol", "alice", "bob"] {
            ProfileStore::new(&layout, name).init_user().unwrap();
        }
        // A stray file at the root must not be listed
        std::fs::write(layout.profiles_root().join("README"), b"ignore me").unwrap();

        assert_eq!(list_users(&layout), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_list_users_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path(), Some(9));
        assert!(list_users(&layout).is_empty());
    }
}
