//! Data models for the annotation tool.
//!
//! This module contains all the core data structures used throughout
//! the application for representing QA records, judgments, and exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single machine-generated question/answer pair awaiting judgment.
///
/// Identity is positional within the loaded dataset; records are never
/// modified after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    /// The source document the pair was generated from.
    pub context: String,
    /// The generated question.
    pub question: String,
    /// The generated answer (expected to be a snippet of the context).
    pub answer: String,
}

/// The annotator's top-level verdict on a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionVerdict {
    /// The question cannot be answered from the document or is irrelevant.
    Unsuitable,
    /// The question is answerable and relevant.
    Suitable,
}

impl fmt::Display for QuestionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionVerdict::Unsuitable => write!(f, "unsuitable"),
            QuestionVerdict::Suitable => write!(f, "suitable"),
        }
    }
}

/// The three independent judgments an annotator makes about an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerAssessment {
    /// The original answer reads naturally.
    pub natural: bool,
    /// The original answer is adequate when paired with the context.
    pub adequate: bool,
    /// The original answer is precise and correct (implies adequate).
    pub precise: bool,
}

impl AnswerAssessment {
    /// True when every box is ticked, i.e. the original answer needs no edits.
    pub fn fully_endorsed(&self) -> bool {
        self.natural && self.adequate && self.precise
    }
}

/// One persisted annotation: the original pair, the judgments, and the
/// annotator's possibly-revised question and answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// The source document.
    pub context: String,
    /// The original generated question.
    pub question: String,
    /// The original generated answer.
    pub answer: String,
    /// Whether the original question reads naturally.
    pub question_natural: bool,
    /// Whether the original answer reads naturally.
    pub answer_natural: bool,
    /// Whether the original answer is adequate.
    pub answer_adequate: bool,
    /// Whether the original answer is precise and correct.
    pub answer_precise: bool,
    /// The annotator's question (may equal the original).
    pub user_question: String,
    /// The annotator's answer (may equal the original).
    pub user_answer: String,
    /// When the judgment was submitted.
    pub annotated_at: DateTime<Utc>,
}

impl Annotation {
    /// Whether the *original* pair is good enough to export alongside the
    /// annotator's revision: natural question, natural answer, and an answer
    /// that is at least adequate.
    pub fn original_endorsed(&self) -> bool {
        self.question_natural
            && self.answer_natural
            && (self.answer_adequate || self.answer_precise)
    }
}

/// Questions judged unanswerable or irrelevant, grouped by context.
pub type UnsuitableMap = BTreeMap<String, Vec<String>>;

/// Seconds spent per calibration page and per annotated pair.
///
/// Keys are positional indices; serde_json renders them as string keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Times {
    /// Calibration page index -> accumulated seconds.
    #[serde(default)]
    pub examples: BTreeMap<usize, f64>,
    /// Dataset index -> seconds spent before submission.
    #[serde(default)]
    pub questions: BTreeMap<usize, f64>,
}

/// Optional free-text explanations attached to a judgment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    /// Explanation of the question judgment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Explanation of the answer judgment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl NoteEntry {
    /// True when neither field carries text.
    pub fn is_empty(&self) -> bool {
        self.question.is_none() && self.answer.is_none()
    }
}

/// Notes keyed by context, then by question.
pub type Notes = BTreeMap<String, BTreeMap<String, NoteEntry>>;

/// A SQuAD v2 dataset, the secondary export format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadDataset {
    /// Format version marker ("v2.0").
    pub version: String,
    /// Top-level articles.
    pub data: Vec<SquadArticle>,
}

/// A SQuAD article grouping paragraphs under a title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadArticle {
    pub title: String,
    pub paragraphs: Vec<SquadParagraph>,
}

/// A context paragraph and its questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadParagraph {
    pub context: String,
    pub qas: Vec<SquadQuestion>,
}

/// A single SQuAD question with its accepted answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadQuestion {
    /// Hyphen-less UUID.
    pub id: String,
    pub question: String,
    pub answers: Vec<SquadAnswer>,
    /// Always false: the tool only exports answerable questions.
    pub is_impossible: bool,
}

/// An answer span within its paragraph's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadAnswer {
    /// The answer text, a verbatim snippet of the context.
    pub text: String,
    /// Byte offset of the snippet within the context.
    pub answer_start: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_annotation() -> Annotation {
        Annotation {
            context: "Widget Inc. achieved profits of £50'000 in 2018.".to_string(),
            question: "What did Widget Inc. achieve?".to_string(),
            answer: "profits of £50'000".to_string(),
            question_natural: true,
            answer_natural: true,
            answer_adequate: true,
            answer_precise: false,
            user_question: "What did Widget Inc. achieve?".to_string(),
            user_answer: "profits of £50'000".to_string(),
            annotated_at: Utc::now(),
        }
    }

    #[test]
    fn test_original_endorsed_requires_adequate_or_precise() {
        let mut annotation = make_annotation();
        assert!(annotation.original_endorsed());

        annotation.answer_adequate = false;
        assert!(!annotation.original_endorsed());

        annotation.answer_precise = true;
        assert!(annotation.original_endorsed());
    }

    #[test]
    fn test_original_endorsed_requires_naturalness() {
        let mut annotation = make_annotation();
        annotation.question_natural = false;
        assert!(!annotation.original_endorsed());

        annotation.question_natural = true;
        annotation.answer_natural = false;
        assert!(!annotation.original_endorsed());
    }

    #[test]
    fn test_answer_assessment_fully_endorsed() {
        let assessment = AnswerAssessment {
            natural: true,
            adequate: true,
            precise: true,
        };
        assert!(assessment.fully_endorsed());

        let partial = AnswerAssessment {
            natural: true,
            adequate: true,
            precise: false,
        };
        assert!(!partial.fully_endorsed());
    }

    #[test]
    fn test_times_roundtrip_through_json() {
        let mut times = Times::default();
        times.examples.insert(0, 12.5);
        times.questions.insert(3, 40.25);

        let json = serde_json::to_string(&times).unwrap();
        let parsed: Times = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, times);
    }

    #[test]
    fn test_annotation_roundtrip_through_json() {
        let annotation = make_annotation();
        let json = serde_json::to_string_pretty(&annotation).unwrap();
        let parsed: Annotation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, annotation);
    }

    #[test]
    fn test_note_entry_is_empty() {
        assert!(NoteEntry::default().is_empty());

        let note = NoteEntry {
            question: Some("unclear phrasing".to_string()),
            answer: None,
        };
        assert!(!note.is_empty());
    }
}
