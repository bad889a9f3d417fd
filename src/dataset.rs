//! Input dataset loading.
//!
//! The upstream generation pipeline owns the input format: a JSON object
//! mapping each context document to an object of question -> answer pairs.
//! This module resolves which file a run reads, flattens it into records,
//! and optionally applies the per-annotator shuffle.

use crate::models::QaRecord;
use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha512};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Which dataset a session runs against. The variants are mutually
/// exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// The full dataset.
    Full,
    /// The preliminary dataset, with its own output directory.
    Preliminary,
    /// A fixed pre-partitioned slice of the dataset.
    Subset(u32),
}

impl RunMode {
    /// File name of the dataset this mode reads.
    pub fn data_filename(&self) -> String {
        match self {
            RunMode::Full => "generated_data.json".to_string(),
            RunMode::Preliminary => "preliminary_generated_data.json".to_string(),
            RunMode::Subset(index) => format!("subset_{}_generated_data.json", index),
        }
    }

    /// Full path of the dataset within the input directory.
    pub fn data_filepath(&self, input_dir: &Path) -> PathBuf {
        input_dir.join(self.data_filename())
    }

    /// Subset index, when running on a subset.
    pub fn subset_index(&self) -> Option<u32> {
        match self {
            RunMode::Subset(index) => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Full => write!(f, "full"),
            RunMode::Preliminary => write!(f, "preliminary"),
            RunMode::Subset(index) => write!(f, "subset {}", index),
        }
    }
}

/// Load and flatten a generated dataset.
///
/// Records keep the file's own ordering (contexts in file order, questions
/// in file order within each context), so positional identity is stable
/// across runs. A missing or malformed file is fatal; the operator has to
/// fix the setup before annotators can be let in.
pub fn load_dataset(path: &Path) -> Result<Vec<QaRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;

    let mut records = Vec::new();

    for (context, qa_pairs) in &raw {
        let Some(pairs) = qa_pairs.as_object() else {
            bail!(
                "Malformed dataset {}: expected an object of question/answer pairs per context",
                path.display()
            );
        };

        for (question, answer) in pairs {
            let Some(answer) = answer.as_str() else {
                bail!(
                    "Malformed dataset {}: answer for {:?} is not a string",
                    path.display(),
                    question
                );
            };

            records.push(QaRecord {
                context: context.clone(),
                question: question.clone(),
                answer: answer.to_string(),
            });
        }
    }

    info!("Loaded {} QA records from {}", records.len(), path.display());
    Ok(records)
}

/// Shuffle records deterministically for one annotator.
///
/// Pairs sharing a context stay contiguous: the order of context groups is
/// shuffled, and so is the order of pairs within each group. The same
/// username always yields the same permutation.
pub fn shuffle_records(username: &str, records: Vec<QaRecord>) -> Vec<QaRecord> {
    let mut rng = StdRng::seed_from_u64(username_seed(username));

    // Group by context, preserving first-appearance order
    let mut groups: Vec<(String, Vec<QaRecord>)> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|(context, _)| *context == record.context) {
            Some((_, group)) => group.push(record),
            None => groups.push((record.context.clone(), vec![record])),
        }
    }

    for (_, group) in &mut groups {
        group.shuffle(&mut rng);
    }
    groups.shuffle(&mut rng);

    groups.into_iter().flat_map(|(_, group)| group).collect()
}

/// Stable 64-bit seed derived from the username.
fn username_seed(username: &str) -> u64 {
    let digest = Sha512::digest(username.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
