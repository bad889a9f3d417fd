//! SQuAD v2 export.
//!
//! Besides the raw annotation profile, every save rewrites a SQuAD v2
//! rendition of the kept pairs so downstream training code can consume the
//! judgments directly. Originals that failed a judgment are routed into the
//! unnatural/incorrect side channels instead of the dataset.

use crate::models::{
    Annotation, SquadAnswer, SquadArticle, SquadDataset, SquadParagraph, SquadQuestion,
};
use tracing::error;
use uuid::Uuid;

/// Title attached to the single exported SQuAD article.
const ARTICLE_TITLE: &str = "QAnnotate";

/// Everything one export pass produces.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    /// Valid QA pairs (annotator revisions plus endorsed originals).
    pub squad: SquadDataset,
    /// Questions and answers judged as not reading naturally.
    pub unnatural: Vec<String>,
    /// Question/answer pairs judged incorrect.
    pub incorrect: Vec<(String, String)>,
}

/// Convert kept pairs to SQuAD v2, filtering rejected originals into their
/// own buckets.
///
/// The annotator's revised pair is always exported. The original pair is
/// exported too when its question and answer were judged natural and the
/// answer at least adequate; otherwise the offending parts land in
/// `unnatural` / `incorrect`.
pub fn export_annotations(kept_pairs: &[Annotation]) -> ExportBundle {
    let mut unnatural = Vec::new();
    let mut incorrect = Vec::new();

    // context -> question -> answer spans, insertion-ordered
    let mut contexts: Vec<(String, Vec<(String, Vec<SquadAnswer>)>)> = Vec::new();

    for kept in kept_pairs {
        let mut pairs_to_add = vec![(kept.user_question.as_str(), kept.user_answer.as_str())];

        if kept.original_endorsed() {
            pairs_to_add.push((kept.question.as_str(), kept.answer.as_str()));
        } else {
            if !kept.question_natural {
                unnatural.push(kept.question.clone());
            }
            if !kept.answer_natural {
                unnatural.push(kept.answer.clone());
            }
            if !kept.answer_precise && !kept.answer_adequate {
                incorrect.push((kept.question.clone(), kept.answer.clone()));
            }
        }

        for (question, answer) in pairs_to_add {
            let Some(answer_start) = kept.context.find(answer) else {
                // Validation keeps this from happening for user answers, but an
                // upstream original may not be a snippet of its own context.
                error!(
                    "Answer {:?} is not a snippet of its context; dropping from export",
                    answer
                );
                continue;
            };

            let span = SquadAnswer {
                text: answer.to_string(),
                answer_start,
            };

            let slot = match contexts.iter().position(|(c, _)| *c == kept.context) {
                Some(position) => position,
                None => {
                    contexts.push((kept.context.clone(), Vec::new()));
                    contexts.len() - 1
                }
            };
            let questions = &mut contexts[slot].1;

            match questions.iter_mut().find(|(q, _)| *q == question) {
                Some((_, answers)) => {
                    // A fully-endorsed original equals the user pair; keep one span
                    if !answers.contains(&span) {
                        answers.push(span);
                    }
                }
                None => questions.push((question.to_string(), vec![span])),
            }
        }
    }

    let paragraphs = contexts
        .into_iter()
        .map(|(context, questions)| SquadParagraph {
            context,
            qas: questions
                .into_iter()
                .map(|(question, answers)| SquadQuestion {
                    id: Uuid::new_v4().simple().to_string(),
                    question,
                    answers,
                    is_impossible: false,
                })
                .collect(),
        })
        .collect();

    ExportBundle {
        squad: SquadDataset {
            version: "v2.0".to_string(),
            data: vec![SquadArticle {
                title: ARTICLE_TITLE.to_string(),
                paragraphs,
            }],
        },
        unnatural,
        incorrect,
    }
}
