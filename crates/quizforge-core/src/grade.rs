//! Answer grading.
//!
//! Graders are pure: the same question, answer, context and parameter map
//! always produce the same [`Feedback`]. A wrong answer is a normal result;
//! only a broken stored question or an answer of the wrong shape is an error.

use std::collections::BTreeSet;

use crate::error::{DataIntegrityError, QuizError};
use crate::expr;
use crate::model::{
    Answer, Feedback, FeedbackStatus, LotOrder, MatchRow, ParameterMap, Question, QuizContext,
    Solution,
};
use crate::tags::inline_param_names;

/// Grade `answer` against `question`.
///
/// `parameter_map` must be the map the student's view was rendered with; it
/// is needed for NAT questions that store an expression. `selected_texts`
/// are appended to select-type feedback when non-empty (see
/// [`selected_item_texts`]).
pub fn grade_question(
    question: &Question,
    answer: &Answer,
    context: &QuizContext,
    parameter_map: Option<&ParameterMap>,
    selected_texts: Option<&[String]>,
) -> Result<Feedback, QuizError> {
    let mismatch = || QuizError::AnswerMismatch {
        expected: question.question_type(),
    };

    let (status, score, message) = match (&question.solution, answer) {
        (
            Solution::SelectOneInLot {
                correct_lot_item, ..
            },
            Answer::SelectOne { lot_item_id },
        ) => {
            let correct = *lot_item_id == correct_lot_item.id;
            let message = if correct {
                "Correct answer!"
            } else {
                "Incorrect answer."
            };
            binary(question, correct, with_selected(message, selected_texts))
        }

        (
            Solution::SelectManyInLot {
                correct_lot_items, ..
            },
            Answer::SelectMany { lot_item_ids },
        ) => {
            if correct_lot_items.is_empty() {
                return Err(integrity(question, "correct lot items").into());
            }
            let correct: BTreeSet<&str> =
                correct_lot_items.iter().map(|i| i.id.as_str()).collect();
            let submitted: BTreeSet<&str> = lot_item_ids.iter().map(String::as_str).collect();

            if context.allow_partial_grading {
                let hits = submitted.intersection(&correct).count();
                let score = hits as f64 / correct.len() as f64 * question.points;
                let message = format!("You got {hits} out of {} correct.", correct.len());
                (
                    status_for(score, question.points),
                    score,
                    with_selected(&message, selected_texts),
                )
            } else {
                let exact = lot_item_ids.len() == correct.len() && submitted == correct;
                let message = if exact {
                    "Correct answer!"
                } else {
                    "Incorrect answer. Please try again."
                };
                binary(question, exact, with_selected(message, selected_texts))
            }
        }

        (Solution::OrderTheLots { ordering }, Answer::Order { ordering: submitted }) => {
            if ordering.is_empty() {
                return Err(integrity(question, "ordering").into());
            }
            let correct = ordering_ids(ordering) == *submitted;
            let message = if correct {
                "Correct order!"
            } else {
                "Incorrect order."
            };
            binary(question, correct, message.to_string())
        }

        (
            Solution::NumericAnswerType {
                decimal_precision,
                upper_limit,
                lower_limit,
                expression,
                ..
            },
            Answer::Numeric { value },
        ) => {
            let submitted = round_to(*value, *decimal_precision);
            let correct = match expression {
                Some(expression) => {
                    let expected = evaluate_expected(question, expression, parameter_map)?;
                    submitted == round_to(expected, *decimal_precision)
                }
                None => *lower_limit <= submitted && submitted <= *upper_limit,
            };
            let message = if correct {
                "Correct answer!"
            } else {
                "Incorrect answer."
            };
            binary(question, correct, message.to_string())
        }

        (Solution::Descriptive { .. }, Answer::Descriptive { .. }) => (
            FeedbackStatus::PendingReview,
            0.0,
            "Submitted for manual review.".to_string(),
        ),

        (Solution::MatchTheLots { matches }, Answer::Match { matches: submitted }) => {
            if matches.is_empty() {
                return Err(integrity(question, "match rows").into());
            }
            grade_matches(question, matches, submitted, context)
        }

        _ => return Err(mismatch()),
    };

    tracing::debug!(question_id = %question.id, %status, score, "graded answer");

    Ok(Feedback {
        question_id: question.id.clone(),
        status,
        score,
        answer_feedback: message,
    })
}

/// Texts of the lot items picked in a select-type answer, incorrect items
/// first, then correct ones. Empty for every other answer shape.
pub fn selected_item_texts(question: &Question, answer: &Answer) -> Vec<String> {
    let selected = answer.selected_ids();
    if selected.is_empty() {
        return Vec::new();
    }
    question
        .lot_items()
        .into_iter()
        .filter(|item| selected.contains(&item.id.as_str()))
        .map(|item| item.text.clone())
        .collect()
}

fn grade_matches(
    question: &Question,
    stored: &[MatchRow],
    submitted: &[Vec<String>],
    context: &QuizContext,
) -> (FeedbackStatus, f64, String) {
    let stored_rows: Vec<BTreeSet<&str>> = stored
        .iter()
        .map(|row| row.items.iter().map(|i| i.id.as_str()).collect())
        .collect();

    let mut matched = BTreeSet::new();
    let mut extra = 0usize;
    for row in submitted {
        let ids: BTreeSet<&str> = row.iter().map(String::as_str).collect();
        match stored_rows.iter().position(|stored| *stored == ids) {
            Some(index) if matched.insert(index) => {}
            _ => extra += 1,
        }
    }

    let message = format!(
        "You matched {} out of {} correctly.",
        matched.len(),
        stored_rows.len()
    );

    if context.allow_partial_grading {
        let score = matched.len() as f64 / stored_rows.len() as f64 * question.points;
        (status_for(score, question.points), score, message)
    } else {
        binary(
            question,
            matched.len() == stored_rows.len() && extra == 0,
            message,
        )
    }
}

fn evaluate_expected(
    question: &Question,
    expression: &str,
    parameter_map: Option<&ParameterMap>,
) -> Result<f64, DataIntegrityError> {
    let empty = ParameterMap::new();
    let map = match parameter_map {
        Some(map) => map,
        None if !question.is_parameterized => &empty,
        None => {
            return Err(expression_error(
                question,
                expression,
                "no parameter map supplied".to_string(),
            ))
        }
    };

    // QParam tags become plain variables so values never lose their grouping.
    expr::evaluate(&inline_param_names(expression), map)
        .map_err(|e| expression_error(question, expression, e.to_string()))
}

fn expression_error(question: &Question, expression: &str, reason: String) -> DataIntegrityError {
    tracing::error!(question_id = %question.id, expression, %reason, "cannot grade question");
    DataIntegrityError::Expression {
        question_id: question.id.clone(),
        expression: expression.to_string(),
        reason,
    }
}

fn integrity(question: &Question, what: &'static str) -> DataIntegrityError {
    tracing::error!(question_id = %question.id, what, "cannot grade question");
    DataIntegrityError::Empty {
        question_id: question.id.clone(),
        what,
    }
}

fn ordering_ids(ordering: &[LotOrder]) -> Vec<String> {
    let mut sorted: Vec<&LotOrder> = ordering.iter().collect();
    sorted.sort_by_key(|entry| entry.order);
    sorted
        .into_iter()
        .map(|entry| entry.lot_item.id.clone())
        .collect()
}

fn binary(question: &Question, correct: bool, message: String) -> (FeedbackStatus, f64, String) {
    if correct {
        (FeedbackStatus::Correct, question.points, message)
    } else {
        (FeedbackStatus::Incorrect, 0.0, message)
    }
}

fn status_for(score: f64, points: f64) -> FeedbackStatus {
    if score <= 0.0 {
        FeedbackStatus::Incorrect
    } else if score == points {
        FeedbackStatus::Correct
    } else {
        FeedbackStatus::Partial
    }
}

fn with_selected(message: &str, selected_texts: Option<&[String]>) -> String {
    match selected_texts {
        Some(texts) if !texts.is_empty() => {
            format!("{message} Selected answer(s): {}.", texts.join(", "))
        }
        _ => message.to_string(),
    }
}

/// Round half away from zero to `digits` fractional digits.
fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits.min(15) as i32);
    (value * factor).round() / factor
}
