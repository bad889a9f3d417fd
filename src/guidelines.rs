//! Instruction and example texts shown during calibration.
//!
//! The texts walk an annotator through the judgments the tool asks for,
//! using one worked document. They are plain text, rendered by the TUI.

/// Guidance for judging questions.
pub fn question_guidelines() -> &'static str {
    r#"A SUITABLE question is answerable from the document alone, without
external information, and is relevant to the document.

As well as being suitable, the question should read naturally: its meaning
should be clear and it should read like fluent English. It does not have to
be perfectly grammatical.

Document:
  "'Widget Inc. achieved profits of £50'000 in the second quarter of 2018',
  reported CEO John McMillan this week, as tech industry stock prices rose
  across the board"

Valid example questions:
  * "What company achieved profits of £50'000 in the second quarter of 2018?"
  * "Who is the CEO of Widget Inc?"

These questions can be accepted without modification. We don't consider the
answer here: as long as a question is answerable from the document, the
answer itself doesn't matter. The initial answer may be wrong and need
corrections, but as long as YOU can determine the correct answer, the
question itself is fine.

Suitable but non-natural questions, and corrections:
  * "What is the company name that achieved £50'000 in profit in the second
    quarter of 2018?" -> "Which company achieved profits of £50'000 in the
    second quarter of 2018?"
  * "Which number quarter of 2018 were the profits from?" -> "Which quarter
    of 2018 did Widget Inc. earn the profits in?"

These don't read naturally in their original forms, though their meanings
can be understood. Untick "reads naturally" and correct them in the text
field, preserving the overall meaning. Do NOT mark them as unsuitable.

UNSUITABLE questions:
  * "Who is the Chief Financial Officer of Widget Inc?" -- not stated in the
    document, so the question is impossible to answer.
  * "What fires can be started?" -- not stated in the document, and makes no
    sense as a product of it; completely irrelevant.

These questions should be marked as unsuitable."#
}

/// Guidance for judging answers.
pub fn answer_guidelines() -> &'static str {
    r#"A SUITABLE answer reads naturally and correctly answers the question
based on the information in the document.

Answers must be a case-sensitive snippet of the document.

Naturalness is relative to the document: the answer doesn't need perfect
grammar, but it should read easily, without extra effort to work out the
meaning.

Beyond reading naturally, an answer may be judged "adequate" (it answers the
question correctly when paired with the context, but may have missing or
unnecessary detail) and "precise and correct" (additionally, no missing or
unnecessary detail). Any precise-and-correct answer is necessarily also
adequate, though it might not read naturally.

Document:
  "'Widget Inc. achieved profits of £50'000 in the second quarter of 2018',
  reported CEO John McMillan this week, as tech industry stock prices rose
  across the board"

Question:
  "When did Widget Inc. achieve profits of £50'000?"

Precise and correct example answer:
  > in the second quarter of 2018
  Precise and factually correct. No missing information, nothing extra.

Adequate, but imprecise answers:
  > 2018'
  Correct, and fine when paired with the document, but imprecise: we can say
  more about WHEN in 2018. The stray apostrophe is unnecessary but doesn't
  affect readability, so it can be ignored here.

  > in the second quarter of 2018', reported
  Correct, but with unnecessary text at the end ("reported"). Adequate but
  not precise.

Incorrect:
  > this week
  Reads naturally, but is incorrect and should be marked as such, then
  corrected using the text field."#
}

/// Why-this-tool blurb shown at login and on the annotation screen.
pub fn purpose_text() -> &'static str {
    r#"This tool allows you to judge whether a given question and answer are
correct and read naturally, based on a short document.

This data is used to refine the Artificial Intelligence model which
generated them. Once fully trained, the model can automatically answer
questions posed about documents such as news articles. The more data you
judge, the faster and better the model can learn to do so.

All of the data shown is entirely computer-generated.

Thank you for participating!"#
}

/// The calibration pages, in presentation order.
pub fn calibration_pages() -> Vec<(&'static str, &'static str)> {
    vec![
        ("1. Judging Questions", question_guidelines()),
        ("2. Judging Answers", answer_guidelines()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_calibration_pages_in_order() {
        let pages = calibration_pages();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].0.starts_with("1."));
        assert!(pages[1].0.starts_with("2."));
    }

    #[test]
    fn test_guidelines_share_the_worked_example() {
        assert!(question_guidelines().contains("Widget Inc."));
        assert!(answer_guidelines().contains("Widget Inc."));
    }
}
