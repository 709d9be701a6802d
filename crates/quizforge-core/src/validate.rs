//! Authoring-time question validation.
//!
//! Every question goes through the base checks first, then the checks of its
//! own type. The first failing check rejects the whole question.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::model::{LotItem, Question, Solution};
use crate::tag_parser::TagParser;
use crate::tags::{inline_param_names, validate_expression, QParamTag, TagProcessor};

/// Validate `question` against its type's rules.
pub fn validate_question(question: &Question, parser: &TagParser) -> Result<(), ValidationError> {
    validate_base(question, parser)?;

    match &question.solution {
        Solution::SelectOneInLot { .. } | Solution::OrderTheLots { .. } => {
            validate_lot(question, parser)
        }
        Solution::SelectManyInLot {
            correct_lot_items, ..
        } => {
            if correct_lot_items.is_empty() {
                return Err(ValidationError::NoCorrectLotItems);
            }
            validate_parameters_referenced(question)?;
            validate_lot(question, parser)
        }
        Solution::NumericAnswerType {
            upper_limit,
            lower_limit,
            expression,
            ..
        } => {
            if lower_limit > upper_limit {
                return Err(ValidationError::InvalidBounds {
                    lower: *lower_limit,
                    upper: *upper_limit,
                });
            }
            match expression {
                Some(_) if *lower_limit != 0.0 || *upper_limit != 0.0 => {
                    Err(ValidationError::BoundsWithExpression {
                        lower: *lower_limit,
                        upper: *upper_limit,
                    })
                }
                Some(expression) => validate_nat_expression(question, expression, parser),
                None => Ok(()),
            }
        }
        Solution::Descriptive { solution_text } => {
            validate_if_tagged(solution_text, question, parser)
        }
        Solution::MatchTheLots { .. } => {
            let items = question.lot_items();
            check_unique_ids(&items)?;
            for item in items {
                validate_if_tagged(&item.text, question, parser)?;
                validate_if_tagged(&item.explanation, question, parser)?;
            }
            Ok(())
        }
    }
}

/// Checks shared by every question type.
fn validate_base(question: &Question, parser: &TagParser) -> Result<(), ValidationError> {
    if question.is_parameterized && !question.parameters.is_empty() {
        if !parser.is_any_valid_tag_present(&question.text) {
            return Err(ValidationError::MissingTag);
        }
        parser.validate_tags(&question.text, &question.parameters)?;

        if let Some(hint) = &question.hint {
            validate_if_tagged(hint, question, parser)?;
        }
    }

    if !question.is_parameterized && !question.parameters.is_empty() {
        return Err(ValidationError::ParametersOnNonParameterized);
    }

    if question.is_parameterized && question.parameters.is_empty() {
        return Err(ValidationError::NoParameters);
    }

    let mut seen = HashSet::new();
    for parameter in &question.parameters {
        if !seen.insert(parameter.name.as_str()) {
            return Err(ValidationError::DuplicateParameter(parameter.name.clone()));
        }
    }

    Ok(())
}

/// Run tag validation on `text` only if it contains a recognized tag.
fn validate_if_tagged(
    text: &str,
    question: &Question,
    parser: &TagParser,
) -> Result<(), ValidationError> {
    if parser.is_any_valid_tag_present(text) {
        parser.validate_tags(text, &question.parameters)?;
    }
    Ok(())
}

/// Every declared parameter must be referenced by a `QParam` tag in the text.
fn validate_parameters_referenced(question: &Question) -> Result<(), ValidationError> {
    if !question.is_parameterized {
        return Ok(());
    }
    let referenced: HashSet<String> = QParamTag
        .extract(&question.text)
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect();

    for parameter in &question.parameters {
        if !referenced.contains(&parameter.name) {
            return Err(ValidationError::ParameterNotReferenced(
                parameter.name.clone(),
            ));
        }
    }
    Ok(())
}

/// Lot rules for SOL, SML and OTL.
fn validate_lot(question: &Question, parser: &TagParser) -> Result<(), ValidationError> {
    let items = question.lot_items();
    if items.is_empty() {
        return Err(ValidationError::EmptyLot(question.question_type()));
    }

    check_unique_ids(&items)?;

    if !question.is_parameterized {
        return Ok(());
    }

    let any_tagged = items.iter().any(|item| {
        parser.is_any_valid_tag_present(&item.text)
            || parser.is_any_valid_tag_present(&item.explanation)
    });
    if !any_tagged {
        return Err(ValidationError::LotItemsMissingTag);
    }

    for item in items {
        validate_if_tagged(&item.text, question, parser)?;
        validate_if_tagged(&item.explanation, question, parser)?;
    }
    Ok(())
}

fn check_unique_ids(items: &[&LotItem]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(ValidationError::DuplicateLotItemId(item.id.clone()));
        }
    }
    Ok(())
}

/// A NAT expression may reference parameters either bare (`x + y`) or via
/// `QParam` tags; both forms must resolve to declared number parameters.
fn validate_nat_expression(
    question: &Question,
    expression: &str,
    parser: &TagParser,
) -> Result<(), ValidationError> {
    parser.validate_tags(expression, &question.parameters)?;
    validate_expression(&inline_param_names(expression), &question.parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LotOrder, MatchRow, ParameterType, QuestionParameter, QuestionType};

    fn item(id: &str, text: &str) -> LotItem {
        LotItem {
            id: id.into(),
            text: text.into(),
            explanation: String::new(),
        }
    }

    fn param(name: &str, kind: ParameterType) -> QuestionParameter {
        QuestionParameter {
            name: name.into(),
            possible_values: vec!["1".into()],
            kind,
        }
    }

    fn question(text: &str, parameters: Vec<QuestionParameter>, solution: Solution) -> Question {
        Question {
            id: "q1".into(),
            text: text.into(),
            hint: None,
            is_parameterized: !parameters.is_empty(),
            parameters,
            time_limit_seconds: 60,
            points: 10.0,
            solution,
        }
    }

    fn sml(correct: Vec<LotItem>, incorrect: Vec<LotItem>) -> Solution {
        Solution::SelectManyInLot {
            correct_lot_items: correct,
            incorrect_lot_items: incorrect,
        }
    }

    fn sol(correct: LotItem, incorrect: Vec<LotItem>) -> Solution {
        Solution::SelectOneInLot {
            correct_lot_item: correct,
            incorrect_lot_items: incorrect,
        }
    }

    #[test]
    fn parameterized_question_without_tag_is_rejected() {
        let q = question(
            "What is x?",
            vec![param("x", ParameterType::Number)],
            sol(item("A", "<QParam>x</QParam>"), vec![item("B", "no")]),
        );
        assert_eq!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::MissingTag)
        );
    }

    #[test]
    fn parameter_flags_must_agree() {
        let parser = TagParser::default();

        let mut q = question(
            "Plain",
            vec![],
            sol(item("A", "yes"), vec![item("B", "no")]),
        );
        assert!(validate_question(&q, &parser).is_ok());

        q.parameters = vec![param("x", ParameterType::Number)];
        assert_eq!(
            validate_question(&q, &parser),
            Err(ValidationError::ParametersOnNonParameterized)
        );

        q.parameters.clear();
        q.is_parameterized = true;
        assert_eq!(
            validate_question(&q, &parser),
            Err(ValidationError::NoParameters)
        );
    }

    #[test]
    fn duplicate_parameter_names() {
        let q = question(
            "<QParam>x</QParam>",
            vec![param("x", ParameterType::Number), param("x", ParameterType::String)],
            sol(item("A", "<QParam>x</QParam>"), vec![item("B", "no")]),
        );
        assert_eq!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::DuplicateParameter("x".into()))
        );
    }

    #[test]
    fn undeclared_reference_in_hint_is_rejected() {
        let mut q = question(
            "<QParam>x</QParam>",
            vec![param("x", ParameterType::Number)],
            sol(item("A", "<QParam>x</QParam>"), vec![item("B", "no")]),
        );
        q.hint = Some("Think about <QParam>y</QParam>".into());
        assert_eq!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::UnknownParameter("y".into()))
        );
    }

    #[test]
    fn sml_requires_every_parameter_in_text() {
        let q = question(
            "Select <QParam>animal</QParam>",
            vec![
                param("animal", ParameterType::String),
                param("color", ParameterType::String),
            ],
            sml(vec![item("A", "<QParam>color</QParam>")], vec![item("B", "x")]),
        );
        assert_eq!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::ParameterNotReferenced("color".into()))
        );
    }

    #[test]
    fn sml_accepts_well_formed_question() {
        let q = question(
            "Select all correct options: <QParam>animal</QParam>, <QParam>color</QParam>",
            vec![
                param("animal", ParameterType::String),
                param("color", ParameterType::String),
            ],
            sml(
                vec![
                    item("A", "Correct: <QParam>animal</QParam>"),
                    item("B", "Correct color: <QParam>color</QParam>"),
                ],
                vec![item("C", "Incorrect option")],
            ),
        );
        assert!(validate_question(&q, &TagParser::default()).is_ok());
    }

    #[test]
    fn duplicate_lot_item_ids() {
        let q = question(
            "Pick",
            vec![],
            sml(vec![item("A", "one")], vec![item("A", "two")]),
        );
        assert_eq!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::DuplicateLotItemId("A".into()))
        );
    }

    #[test]
    fn parameterized_lot_needs_a_tagged_item() {
        let q = question(
            "Order <QParam>a</QParam>",
            vec![param("a", ParameterType::String)],
            Solution::OrderTheLots {
                ordering: vec![
                    LotOrder {
                        lot_item: item("1", "first"),
                        order: 1,
                    },
                    LotOrder {
                        lot_item: item("2", "second"),
                        order: 2,
                    },
                ],
            },
        );
        assert_eq!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::LotItemsMissingTag)
        );
    }

    #[test]
    fn tagged_lot_item_explanation_is_validated() {
        let mut correct = item("A", "<QParam>a</QParam>");
        correct.explanation = "<NumExpr>a + 1</NumExpr>".into();
        let q = question(
            "<QParam>a</QParam>",
            vec![param("a", ParameterType::String)],
            sol(correct, vec![item("B", "no")]),
        );
        assert!(matches!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::NonNumericParameter { .. })
        ));
    }

    #[test]
    fn empty_lots_and_missing_correct_items() {
        let parser = TagParser::default();
        let q = question("Pick", vec![], sml(vec![], vec![item("B", "no")]));
        assert_eq!(
            validate_question(&q, &parser),
            Err(ValidationError::NoCorrectLotItems)
        );

        let q = question("Order", vec![], Solution::OrderTheLots { ordering: vec![] });
        assert_eq!(
            validate_question(&q, &parser),
            Err(ValidationError::EmptyLot(QuestionType::OrderTheLots))
        );
    }

    #[test]
    fn nat_expression_with_qparam_tags() {
        let q = question(
            "What is <QParam>x</QParam> + <QParam>y</QParam>?",
            vec![param("x", ParameterType::Number), param("y", ParameterType::Number)],
            Solution::NumericAnswerType {
                decimal_precision: 0,
                upper_limit: 0.0,
                lower_limit: 0.0,
                value: None,
                expression: Some("<QParam>x</QParam> + <QParam>y</QParam>".into()),
            },
        );
        assert!(validate_question(&q, &TagParser::default()).is_ok());
    }

    #[test]
    fn nat_rejects_bad_expression_and_bounds() {
        let parser = TagParser::default();
        let mut q = question(
            "What is <QParam>x</QParam> doubled?",
            vec![param("x", ParameterType::Number)],
            Solution::NumericAnswerType {
                decimal_precision: 0,
                upper_limit: 0.0,
                lower_limit: 0.0,
                value: None,
                expression: Some("x * z".into()),
            },
        );
        assert_eq!(
            validate_question(&q, &parser),
            Err(ValidationError::UnknownParameter("z".into()))
        );

        q.solution = Solution::NumericAnswerType {
            decimal_precision: 0,
            upper_limit: 1.0,
            lower_limit: 5.0,
            value: None,
            expression: None,
        };
        assert!(matches!(
            validate_question(&q, &parser),
            Err(ValidationError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn nat_expression_must_not_carry_limits() {
        let q = question(
            "Square <QParam>x</QParam>",
            vec![param("x", ParameterType::Number)],
            Solution::NumericAnswerType {
                decimal_precision: 0,
                upper_limit: 10.0,
                lower_limit: 1.0,
                value: None,
                expression: Some("<QParam>x</QParam>^2".into()),
            },
        );
        assert_eq!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::BoundsWithExpression {
                lower: 1.0,
                upper: 10.0
            })
        );
    }

    #[test]
    fn nat_expression_rejects_string_parameter_in_qparam() {
        let q = question(
            "Double <QParam>name</QParam>",
            vec![param("name", ParameterType::String)],
            Solution::NumericAnswerType {
                decimal_precision: 0,
                upper_limit: 0.0,
                lower_limit: 0.0,
                value: None,
                expression: Some("<QParam>name</QParam> * 2".into()),
            },
        );
        assert!(matches!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::NonNumericParameter { .. })
        ));
    }

    #[test]
    fn match_items_must_have_unique_ids() {
        let q = question(
            "Match",
            vec![],
            Solution::MatchTheLots {
                matches: vec![
                    MatchRow {
                        items: vec![item("a", "Paris"), item("1", "France")],
                    },
                    MatchRow {
                        items: vec![item("b", "Rome"), item("1", "Italy")],
                    },
                ],
            },
        );
        assert_eq!(
            validate_question(&q, &TagParser::default()),
            Err(ValidationError::DuplicateLotItemId("1".into()))
        );
    }
}
