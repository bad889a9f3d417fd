//! Annotation session state.
//!
//! An `AnnotationSession` owns the loaded dataset, the annotator's profile,
//! and the cursor over the records. It resumes from disk, skips pairs that
//! were already judged, validates submissions, and persists the profile
//! after every accepted judgment so nothing is lost between page loads.

use crate::models::{
    Annotation, AnswerAssessment, NoteEntry, QaRecord, QuestionVerdict,
};
use crate::profile::{ProfileStore, UserProfile};
use anyhow::Result;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// A submission-rule violation. Shown to the annotator inline; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("The question cannot be blank.")]
    BlankQuestion,

    #[error("The answer cannot be blank.")]
    BlankAnswer,

    #[error(
        "The question is marked as reading naturally, but has also been modified. \
         Only questions that do not read naturally should be modified."
    )]
    NaturalQuestionModified,

    #[error(
        "The question is marked as not reading naturally, but it has not been modified. \
         Please modify it to read naturally."
    )]
    UnnaturalQuestionUnmodified,

    #[error(
        "The answer \"{0}\" does not appear in the document. Please provide a \
         case-sensitive snippet of the document, or mark the question as unsuitable."
    )]
    AnswerNotInContext(String),

    #[error("Any precise-and-correct answer should also be adequate, but it was not marked as such.")]
    PreciseButNotAdequate,

    #[error(
        "The answer is marked as precise, correct and reading naturally, but has been \
         modified. Only answers with problems should be modified."
    )]
    EndorsedAnswerModified,

    #[error(
        "The answer is marked as not reading naturally, but has not been modified. \
         Please modify it to read naturally."
    )]
    UnnaturalAnswerUnmodified,

    #[error(
        "The answer is marked as incorrect, but has not been modified. \
         Please modify it to be correct."
    )]
    IncorrectAnswerUnmodified,
}

/// One filled-in annotation form, as handed over by the UI.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Top-level question verdict.
    pub verdict: QuestionVerdict,
    /// Whether the original question reads naturally.
    pub question_natural: bool,
    /// The annotator's (possibly revised) question.
    pub user_question: String,
    /// Optional explanation of the question judgment.
    pub question_note: String,
    /// The three answer judgments.
    pub answer: AnswerAssessment,
    /// The annotator's (possibly revised) answer.
    pub user_answer: String,
    /// Optional explanation of the answer judgment.
    pub answer_note: String,
}

/// Cursor over the dataset plus the annotator's accumulated judgments.
pub struct AnnotationSession {
    records: Vec<QaRecord>,
    index: usize,
    completed: HashSet<String>,
    profile: UserProfile,
    store: ProfileStore,
    pair_started: Instant,
}

impl AnnotationSession {
    /// Resume a session from the annotator's stored profile.
    ///
    /// The cursor starts past every record that was already annotated or
    /// judged unsuitable, so reopening the tool continues where the
    /// annotator left off.
    pub fn resume(store: ProfileStore, records: Vec<QaRecord>) -> Result<Self> {
        let profile = store.load()?;

        let completed: HashSet<String> = profile
            .kept_pairs
            .iter()
            .map(|pair| pair.question.clone())
            .collect();

        let mut session = Self {
            records,
            index: 0,
            completed,
            profile,
            store,
            pair_started: Instant::now(),
        };
        session.skip_ahead();

        info!(
            "Resumed session: {}/{} records already judged",
            session.index,
            session.records.len()
        );
        Ok(session)
    }

    /// The record under the cursor, or `None` once everything is judged.
    pub fn current(&self) -> Option<&QaRecord> {
        self.records.get(self.index)
    }

    /// Zero-based cursor position.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Total number of records in this run.
    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Whether every record has been judged.
    pub fn is_finished(&self) -> bool {
        self.index >= self.records.len()
    }

    /// Validate and apply a submission for the current record.
    ///
    /// Returns the rule violations; an empty list means the judgment was
    /// accepted, persisted, and the cursor advanced. I/O failures surface
    /// as errors.
    pub fn submit(&mut self, submission: &Submission) -> Result<Vec<SubmitError>> {
        let Some(record) = self.current().cloned() else {
            return Ok(Vec::new());
        };

        // Timing is recorded per attempt; a failed attempt just overwrites
        // with the larger elapsed value on retry.
        let elapsed = self.pair_started.elapsed().as_secs_f64();
        self.profile.times.questions.insert(self.index, elapsed);

        self.add_notes(&record, submission);

        if submission.verdict == QuestionVerdict::Unsuitable {
            self.profile
                .unsuitable
                .entry(record.context.clone())
                .or_default()
                .push(record.question.clone());

            self.store.save(&self.profile)?;
            debug!("Marked unsuitable: {:?}", record.question);
            self.advance();
            return Ok(Vec::new());
        }

        let errors = validate(&record, submission);
        if !errors.is_empty() {
            return Ok(errors);
        }

        self.profile.kept_pairs.push(Annotation {
            context: record.context.clone(),
            question: record.question.clone(),
            answer: record.answer.clone(),
            question_natural: submission.question_natural,
            answer_natural: submission.answer.natural,
            answer_adequate: submission.answer.adequate,
            answer_precise: submission.answer.precise,
            user_question: submission.user_question.trim().to_string(),
            user_answer: submission.user_answer.trim().to_string(),
            annotated_at: Utc::now(),
        });
        self.completed.insert(record.question.clone());

        self.store.save(&self.profile)?;
        debug!("Saved judgment for {:?}", record.question);
        self.advance();
        Ok(Vec::new())
    }

    /// Accumulate time spent on a calibration page and persist the timing file.
    pub fn record_example_time(&mut self, page: usize, seconds: f64) -> Result<()> {
        *self.profile.times.examples.entry(page).or_insert(0.0) += seconds;
        self.store.save_times(&self.profile.times)
    }

    /// Write the completion marker for this annotator.
    pub fn mark_complete(&self) -> Result<()> {
        self.store.mark_complete()
    }

    fn add_notes(&mut self, record: &QaRecord, submission: &Submission) {
        let entry = NoteEntry {
            question: non_empty(&submission.question_note),
            answer: non_empty(&submission.answer_note),
        };

        if !entry.is_empty() {
            self.profile
                .notes
                .entry(record.context.clone())
                .or_default()
                .insert(record.question.clone(), entry);
        }
    }

    fn advance(&mut self) {
        self.index += 1;
        self.skip_ahead();
        self.pair_started = Instant::now();
    }

    fn skip_ahead(&mut self) {
        while let Some(record) = self.records.get(self.index) {
            let annotated = self.completed.contains(&record.question);
            let unsuitable = self
                .profile
                .unsuitable
                .get(&record.context)
                .is_some_and(|questions| questions.contains(&record.question));

            if annotated || unsuitable {
                self.index += 1;
            } else {
                break;
            }
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Apply the submission rules for a suitable-question judgment.
///
/// Every violated rule is collected; nothing short-circuits, so the
/// annotator sees all problems at once.
fn validate(record: &QaRecord, submission: &Submission) -> Vec<SubmitError> {
    let mut errors = Vec::new();

    let question = submission.user_question.trim();
    let answer = submission.user_answer.trim();

    let question_modified = question != record.question.trim();
    let answer_modified = answer != record.answer.trim();

    if question.is_empty() {
        errors.push(SubmitError::BlankQuestion);
    }
    if answer.is_empty() {
        errors.push(SubmitError::BlankAnswer);
    }

    if question_modified && submission.question_natural {
        errors.push(SubmitError::NaturalQuestionModified);
    } else if !question_modified && !submission.question_natural {
        errors.push(SubmitError::UnnaturalQuestionUnmodified);
    }

    if !answer.is_empty() && !record.context.contains(answer) {
        errors.push(SubmitError::AnswerNotInContext(answer.to_string()));
    }

    if submission.answer.precise && !submission.answer.adequate {
        errors.push(SubmitError::PreciseButNotAdequate);
    }

    if answer_modified {
        if submission.answer.precise && submission.answer.natural {
            errors.push(SubmitError::EndorsedAnswerModified);
        }
    } else {
        if !submission.answer.natural {
            errors.push(SubmitError::UnnaturalAnswerUnmodified);
        }
        if !submission.answer.precise && !submission.answer.adequate {
            errors.push(SubmitError::IncorrectAnswerUnmodified);
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::DataLayout;

    const CONTEXT_A: &str =
        "The BBC began regular television broadcasts in 1936 from Alexandra Palace.";
    const CONTEXT_B: &str = "Marie Curie was awarded the Nobel Prize in Physics in 1903.";

    fn records() -> Vec<QaRecord> {
        vec![
            QaRecord {
                context: CONTEXT_A.to_string(),
                question: "When did the BBC begin television broadcasts?".to_string(),
                answer: "1936".to_string(),
            },
            QaRecord {
                context: CONTEXT_A.to_string(),
                question: "Where did the BBC broadcast from?".to_string(),
                answer: "Alexandra Palace".to_string(),
            },
            QaRecord {
                context: CONTEXT_B.to_string(),
                question: "What prize was Marie Curie awarded in 1903?".to_string(),
                answer: "the Nobel Prize in Physics".to_string(),
            },
        ]
    }

    fn make_store(dir: &tempfile::TempDir) -> ProfileStore {
        let layout = DataLayout {
            input_dir: dir.path().join("input"),
            annotations_root: dir.path().join("annotations"),
            subset: None,
        };
        let store = ProfileStore::new(&layout, "alice");
        store.init_user().unwrap();
        store
    }

    fn endorsing_submission(record: &QaRecord) -> Submission {
        Submission {
            verdict: QuestionVerdict::Suitable,
            question_natural: true,
            user_question: record.question.clone(),
            question_note: String::new(),
            answer: AnswerAssessment {
                natural: true,
                adequate: true,
                precise: true,
            },
            user_answer: record.answer.clone(),
            answer_note: String::new(),
        }
    }

    #[test]
    fn test_accepted_submission_advances_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        let mut session = AnnotationSession::resume(store.clone(), records()).unwrap();

        let submission = endorsing_submission(session.current().unwrap());
        let errors = session.submit(&submission).unwrap();

        assert!(errors.is_empty());
        assert_eq!(session.position(), 1);

        let profile = store.load().unwrap();
        assert_eq!(profile.kept_pairs.len(), 1);
        assert_eq!(
            profile.kept_pairs[0].question,
            "When did the BBC begin television broadcasts?"
        );
        assert!(profile.times.questions.contains_key(&0));
    }

    #[test]
    fn test_resume_skips_already_judged_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);

        {
            let mut session = AnnotationSession::resume(store.clone(), records()).unwrap();
            let submission = endorsing_submission(session.current().unwrap());
            session.submit(&submission).unwrap();
        }

        let resumed = AnnotationSession::resume(store, records()).unwrap();
        assert_eq!(resumed.position(), 1);
        assert_eq!(
            resumed.current().unwrap().question,
            "Where did the BBC broadcast from?"
        );
    }

    #[test]
    fn test_unsuitable_verdict_skips_answer_validation() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        let mut session = AnnotationSession::resume(store.clone(), records()).unwrap();

        let submission = Submission {
            verdict: QuestionVerdict::Unsuitable,
            question_natural: false,
            user_question: String::new(),
            question_note: "  not answerable from the document  ".to_string(),
            answer: AnswerAssessment::default(),
            user_answer: String::new(),
            answer_note: String::new(),
        };

        let errors = session.submit(&submission).unwrap();
        assert!(errors.is_empty());
        assert_eq!(session.position(), 1);

        let profile = store.load().unwrap();
        assert!(profile.kept_pairs.is_empty());
        assert_eq!(
            profile.unsuitable.get(CONTEXT_A).unwrap(),
            &vec!["When did the BBC begin television broadcasts?".to_string()]
        );
        // The note was recorded, trimmed
        let note = &profile.notes[CONTEXT_A]["When did the BBC begin television broadcasts?"];
        assert_eq!(note.question.as_deref(), Some("not answerable from the document"));
    }

    #[test]
    fn test_resume_skips_unsuitable_records_too() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);

        {
            let mut session = AnnotationSession::resume(store.clone(), records()).unwrap();
            let mut submission = endorsing_submission(session.current().unwrap());
            submission.verdict = QuestionVerdict::Unsuitable;
            session.submit(&submission).unwrap();
        }

        let resumed = AnnotationSession::resume(store, records()).unwrap();
        assert_eq!(resumed.position(), 1);
    }

    #[test]
    fn test_rejected_submission_does_not_advance_or_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        let mut session = AnnotationSession::resume(store.clone(), records()).unwrap();

        let mut submission = endorsing_submission(session.current().unwrap());
        submission.user_answer = "never aired".to_string();

        let errors = session.submit(&submission).unwrap();
        assert!(!errors.is_empty());
        assert_eq!(session.position(), 0);
        assert!(store.load().unwrap().kept_pairs.is_empty());
    }

    #[test]
    fn test_session_finishes_after_last_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        let mut session = AnnotationSession::resume(store, records()).unwrap();

        while let Some(record) = session.current().cloned() {
            let submission = endorsing_submission(&record);
            assert!(session.submit(&submission).unwrap().is_empty());
        }

        assert!(session.is_finished());
        assert_eq!(session.total(), 3);
    }

    #[test]
    fn test_record_example_time_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(&dir);
        let mut session = AnnotationSession::resume(store.clone(), records()).unwrap();

        session.record_example_time(0, 10.0).unwrap();
        session.record_example_time(0, 5.0).unwrap();

        let profile = store.load().unwrap();
        assert_eq!(profile.times.examples.get(&0), Some(&15.0));
    }

    fn sample_record() -> QaRecord {
        records().remove(0)
    }

    fn base_submission() -> Submission {
        endorsing_submission(&sample_record())
    }

    #[test]
    fn test_validate_blank_fields() {
        let record = sample_record();
        let mut submission = base_submission();
        submission.user_question = "   ".to_string();
        submission.user_answer = String::new();
        submission.question_natural = false;
        submission.answer.natural = false;

        let errors = validate(&record, &submission);
        assert!(errors.contains(&SubmitError::BlankQuestion));
        assert!(errors.contains(&SubmitError::BlankAnswer));
        // A blank answer must not additionally trip the snippet check
        assert!(!errors
            .iter()
            .any(|e| matches!(e, SubmitError::AnswerNotInContext(_))));
    }

    #[test]
    fn test_validate_natural_question_must_not_be_modified() {
        let record = sample_record();
        let mut submission = base_submission();
        submission.user_question = "When did BBC TV start?".to_string();

        let errors = validate(&record, &submission);
        assert!(errors.contains(&SubmitError::NaturalQuestionModified));
    }

    #[test]
    fn test_validate_unnatural_question_must_be_modified() {
        let record = sample_record();
        let mut submission = base_submission();
        submission.question_natural = false;

        let errors = validate(&record, &submission);
        assert!(errors.contains(&SubmitError::UnnaturalQuestionUnmodified));
    }

    #[test]
    fn test_validate_answer_must_be_context_snippet() {
        let record = sample_record();
        let mut submission = base_submission();
        submission.answer.precise = false;
        submission.answer.natural = false;
        submission.user_answer = "nineteen thirty-six".to_string();

        let errors = validate(&record, &submission);
        assert!(errors
            .iter()
            .any(|e| matches!(e, SubmitError::AnswerNotInContext(_))));
    }

    #[test]
    fn test_validate_precise_implies_adequate() {
        let record = sample_record();
        let mut submission = base_submission();
        submission.answer.adequate = false;

        let errors = validate(&record, &submission);
        assert!(errors.contains(&SubmitError::PreciseButNotAdequate));
    }

    #[test]
    fn test_validate_endorsed_answer_must_not_be_modified() {
        let record = sample_record();
        let mut submission = base_submission();
        // "Alexandra Palace" is a snippet of the context, distinct from "1936"
        submission.user_answer = "Alexandra Palace".to_string();

        let errors = validate(&record, &submission);
        assert!(errors.contains(&SubmitError::EndorsedAnswerModified));
    }

    #[test]
    fn test_validate_unmodified_answer_needs_endorsement() {
        let record = sample_record();
        let mut submission = base_submission();
        submission.answer = AnswerAssessment {
            natural: false,
            adequate: false,
            precise: false,
        };

        let errors = validate(&record, &submission);
        assert!(errors.contains(&SubmitError::UnnaturalAnswerUnmodified));
        assert!(errors.contains(&SubmitError::IncorrectAnswerUnmodified));
    }

    #[test]
    fn test_validate_accepts_consistent_revision() {
        let record = sample_record();
        let mut submission = base_submission();
        submission.question_natural = false;
        submission.user_question = "When did the BBC start broadcasting television?".to_string();
        submission.answer = AnswerAssessment {
            natural: false,
            adequate: true,
            precise: false,
        };
        submission.user_answer = "Alexandra Palace".to_string();

        assert!(validate(&record, &submission).is_empty());
    }
}
