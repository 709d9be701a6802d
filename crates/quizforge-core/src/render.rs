//! Student-facing question views.
//!
//! Rendering substitutes parameters into every text field and shuffles lot
//! items so the view carries no hint of which entries are correct. The view
//! keeps the parameter map it was rendered with so grading can reuse it.
//! A parameterized question rendered without a map gets a freshly drawn one.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::DataIntegrityError;
use crate::model::{LotItem, ParameterMap, Question, RenderBody, RenderView, Solution};
use crate::params::generate_parameter_map;
use crate::tag_parser::TagParser;

/// Render with the thread-local RNG.
pub fn render_question(
    question: &Question,
    parser: &TagParser,
    parameter_map: Option<&ParameterMap>,
) -> Result<RenderView, DataIntegrityError> {
    render_question_with_rng(question, parser, parameter_map, &mut rand::thread_rng())
}

/// Render with an explicit RNG for the shuffle and any parameter draw.
pub fn render_question_with_rng<R: Rng + ?Sized>(
    question: &Question,
    parser: &TagParser,
    parameter_map: Option<&ParameterMap>,
    rng: &mut R,
) -> Result<RenderView, DataIntegrityError> {
    let generated;
    let parameter_map = match parameter_map {
        None if question.is_parameterized => {
            generated = generate_parameter_map(&question.parameters, rng);
            Some(&generated)
        }
        other => other,
    };

    let substitution = Substitution {
        parser,
        context: parameter_map.filter(|_| question.is_parameterized),
    };

    let body = match &question.solution {
        Solution::SelectOneInLot { .. } | Solution::SelectManyInLot { .. } => {
            lot_body(question, &substitution, "lot items", rng)?
        }
        Solution::OrderTheLots { .. } => lot_body(question, &substitution, "ordering", rng)?,
        Solution::NumericAnswerType {
            decimal_precision,
            upper_limit,
            lower_limit,
            value,
            expression,
        } => RenderBody::Numeric {
            decimal_precision: *decimal_precision,
            upper_limit: *upper_limit,
            lower_limit: *lower_limit,
            value: *value,
            expression: expression.clone(),
        },
        Solution::Descriptive { .. } => RenderBody::Descriptive,
        Solution::MatchTheLots { matches } => {
            if matches.is_empty() {
                return Err(empty(question, "match rows"));
            }
            let width = matches.iter().map(|m| m.items.len()).max().unwrap_or(0);
            let mut columns: Vec<Vec<LotItem>> = (0..width)
                .map(|col| {
                    matches
                        .iter()
                        .filter_map(|m| m.items.get(col))
                        .map(|item| substitution.item(item))
                        .collect()
                })
                .collect();
            for column in &mut columns {
                column.shuffle(rng);
            }
            RenderBody::Match { columns }
        }
    };

    Ok(RenderView {
        id: question.id.clone(),
        question_type: question.question_type(),
        is_parameterized: question.is_parameterized,
        text: substitution.text(&question.text),
        hint: question.hint.as_deref().map(|h| substitution.text(h)),
        points: question.points,
        time_limit_seconds: question.time_limit_seconds,
        body,
        parameter_map: parameter_map.cloned(),
    })
}

/// Merge, substitute, and shuffle the lot of a SOL/SML/OTL question.
fn lot_body<R: Rng + ?Sized>(
    question: &Question,
    substitution: &Substitution<'_>,
    what: &'static str,
    rng: &mut R,
) -> Result<RenderBody, DataIntegrityError> {
    let mut lot_items: Vec<LotItem> = question
        .lot_items()
        .into_iter()
        .map(|item| substitution.item(item))
        .collect();
    if lot_items.is_empty() {
        return Err(empty(question, what));
    }
    lot_items.shuffle(rng);
    Ok(RenderBody::Lot { lot_items })
}

fn empty(question: &Question, what: &'static str) -> DataIntegrityError {
    tracing::error!(question_id = %question.id, what, "cannot render question");
    DataIntegrityError::Empty {
        question_id: question.id.clone(),
        what,
    }
}

/// Applies the tag parser only when the question is parameterized.
struct Substitution<'a> {
    parser: &'a TagParser,
    context: Option<&'a ParameterMap>,
}

impl Substitution<'_> {
    fn text(&self, raw: &str) -> String {
        match self.context {
            Some(context) => self.parser.process_text(raw, context),
            None => raw.to_string(),
        }
    }

    fn item(&self, item: &LotItem) -> LotItem {
        LotItem {
            id: item.id.clone(),
            text: self.text(&item.text),
            explanation: self.text(&item.explanation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        LotOrder, MatchRow, ParameterType, ParameterValue, QuestionParameter, QuestionType,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(id: &str, text: &str) -> LotItem {
        LotItem {
            id: id.into(),
            text: text.into(),
            explanation: format!("because {id}"),
        }
    }

    fn sml_question() -> Question {
        Question {
            id: "q-sml".into(),
            text: "Select every <QParam>animal</QParam>".into(),
            hint: Some("Think <QParam>animal</QParam>".into()),
            is_parameterized: true,
            parameters: vec![QuestionParameter {
                name: "animal".into(),
                possible_values: vec!["Dog".into(), "Cat".into()],
                kind: ParameterType::String,
            }],
            time_limit_seconds: 90,
            points: 15.0,
            solution: Solution::SelectManyInLot {
                correct_lot_items: vec![item("A", "<QParam>animal</QParam> one"), item("B", "two")],
                incorrect_lot_items: vec![item("C", "three"), item("D", "four")],
            },
        }
    }

    fn dog() -> ParameterMap {
        let mut map = ParameterMap::new();
        map.insert("animal".into(), ParameterValue::from("Dog"));
        map
    }

    fn lot_ids(view: &RenderView) -> Vec<String> {
        match &view.body {
            RenderBody::Lot { lot_items } => lot_items.iter().map(|i| i.id.clone()).collect(),
            other => panic!("expected lot body, got {other:?}"),
        }
    }

    #[test]
    fn substitutes_text_hint_and_items() {
        let parser = TagParser::default();
        let map = dog();
        let view = render_question(&sml_question(), &parser, Some(&map)).unwrap();
        assert_eq!(view.text, "Select every Dog");
        assert_eq!(view.hint.as_deref(), Some("Think Dog"));
        assert_eq!(view.question_type, QuestionType::SelectManyInLot);
        assert_eq!(view.parameter_map, Some(map));
        let RenderBody::Lot { lot_items } = &view.body else {
            panic!("expected lot body");
        };
        let a = lot_items.iter().find(|i| i.id == "A").unwrap();
        assert_eq!(a.text, "Dog one");
    }

    #[test]
    fn shuffle_preserves_the_multiset_of_ids() {
        let parser = TagParser::default();
        let question = sml_question();
        let map = dog();
        let mut seen_orders = std::collections::HashSet::new();
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let view = render_question_with_rng(&question, &parser, Some(&map), &mut rng).unwrap();
            let mut ids = lot_ids(&view);
            seen_orders.insert(ids.clone());
            ids.sort();
            assert_eq!(ids, vec!["A", "B", "C", "D"]);
        }
        assert!(seen_orders.len() > 1, "shuffle never changed the order");
    }

    #[test]
    fn view_does_not_reveal_correctness() {
        let parser = TagParser::default();
        let view = render_question(&sml_question(), &parser, Some(&dog())).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        let text = json.to_string();
        assert!(!text.contains("correct_lot_items"));
        assert!(!text.contains("incorrect_lot_items"));
        for item in json["body"]["lot_items"].as_array().unwrap() {
            let keys: Vec<&String> = item.as_object().unwrap().keys().collect();
            assert_eq!(keys.len(), 3);
        }
    }

    #[test]
    fn non_parameterized_text_is_left_verbatim() {
        let parser = TagParser::default();
        let mut question = sml_question();
        question.is_parameterized = false;
        question.parameters.clear();
        let view = render_question(&question, &parser, None).unwrap();
        assert_eq!(view.text, "Select every <QParam>animal</QParam>");
        assert!(view.parameter_map.is_none());
    }

    #[test]
    fn parameterized_question_without_map_draws_one() {
        let parser = TagParser::default();
        let mut rng = StdRng::seed_from_u64(3);
        let view = render_question_with_rng(&sml_question(), &parser, None, &mut rng).unwrap();

        let map = view.parameter_map.expect("drawn map");
        let animal = map["animal"].to_string();
        assert!(animal == "Dog" || animal == "Cat");
        assert_eq!(view.text, format!("Select every {animal}"));
        assert!(!view.text.contains("<QParam>"));
    }

    #[test]
    fn numeric_bounds_are_copied() {
        let parser = TagParser::default();
        let question = Question {
            id: "q-nat".into(),
            text: "How many?".into(),
            hint: None,
            is_parameterized: false,
            parameters: vec![],
            time_limit_seconds: 30,
            points: 5.0,
            solution: Solution::NumericAnswerType {
                decimal_precision: 2,
                upper_limit: 10.0,
                lower_limit: 5.0,
                value: Some(7.0),
                expression: None,
            },
        };
        let view = render_question(&question, &parser, None).unwrap();
        assert_eq!(
            view.body,
            RenderBody::Numeric {
                decimal_precision: 2,
                upper_limit: 10.0,
                lower_limit: 5.0,
                value: Some(7.0),
                expression: None,
            }
        );
    }

    #[test]
    fn descriptive_hides_solution_text() {
        let parser = TagParser::default();
        let question = Question {
            id: "q-des".into(),
            text: "Explain".into(),
            hint: None,
            is_parameterized: false,
            parameters: vec![],
            time_limit_seconds: 120,
            points: 8.0,
            solution: Solution::Descriptive {
                solution_text: "the secret answer".into(),
            },
        };
        let view = render_question(&question, &parser, None).unwrap();
        assert_eq!(view.body, RenderBody::Descriptive);
        assert!(!serde_json::to_string(&view).unwrap().contains("secret"));
    }

    #[test]
    fn ordering_and_match_tables() {
        let parser = TagParser::default();
        let mut question = sml_question();
        question.is_parameterized = false;
        question.parameters.clear();

        question.solution = Solution::OrderTheLots {
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
        };
        let mut ids = lot_ids(&render_question(&question, &parser, None).unwrap());
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);

        question.solution = Solution::MatchTheLots {
            matches: vec![
                MatchRow {
                    items: vec![item("a", "Paris"), item("1", "France")],
                },
                MatchRow {
                    items: vec![item("b", "Rome"), item("2", "Italy")],
                },
            ],
        };
        let view = render_question(&question, &parser, None).unwrap();
        let RenderBody::Match { columns } = view.body else {
            panic!("expected match body");
        };
        assert_eq!(columns.len(), 2);
        let mut left: Vec<&str> = columns[0].iter().map(|i| i.id.as_str()).collect();
        left.sort();
        assert_eq!(left, vec!["a", "b"]);
    }

    #[test]
    fn empty_lot_is_a_data_integrity_error() {
        let parser = TagParser::default();
        let mut question = sml_question();
        question.solution = Solution::SelectManyInLot {
            correct_lot_items: vec![],
            incorrect_lot_items: vec![],
        };
        assert!(matches!(
            render_question(&question, &parser, Some(&dog())),
            Err(DataIntegrityError::Empty { .. })
        ));
    }
}
