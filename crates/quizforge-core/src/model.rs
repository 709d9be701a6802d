//! Core data model types for quizforge.
//!
//! Questions, their type-specific solutions, parameter assignments, answers,
//! and the feedback and render views the engine produces.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    SelectOneInLot,
    SelectManyInLot,
    OrderTheLots,
    NumericAnswerType,
    Descriptive,
    MatchTheLots,
}

impl QuestionType {
    /// Short code used in logs and tables (e.g. `SOL`).
    pub fn code(&self) -> &'static str {
        match self {
            QuestionType::SelectOneInLot => "SOL",
            QuestionType::SelectManyInLot => "SML",
            QuestionType::OrderTheLots => "OTL",
            QuestionType::NumericAnswerType => "NAT",
            QuestionType::Descriptive => "DES",
            QuestionType::MatchTheLots => "MTL",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::SelectOneInLot => write!(f, "SELECT_ONE_IN_LOT"),
            QuestionType::SelectManyInLot => write!(f, "SELECT_MANY_IN_LOT"),
            QuestionType::OrderTheLots => write!(f, "ORDER_THE_LOTS"),
            QuestionType::NumericAnswerType => write!(f, "NUMERIC_ANSWER_TYPE"),
            QuestionType::Descriptive => write!(f, "DESCRIPTIVE"),
            QuestionType::MatchTheLots => write!(f, "MATCH_THE_LOTS"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SELECT_ONE_IN_LOT" | "SOL" => Ok(QuestionType::SelectOneInLot),
            "SELECT_MANY_IN_LOT" | "SML" => Ok(QuestionType::SelectManyInLot),
            "ORDER_THE_LOTS" | "OTL" => Ok(QuestionType::OrderTheLots),
            "NUMERIC_ANSWER_TYPE" | "NAT" => Ok(QuestionType::NumericAnswerType),
            "DESCRIPTIVE" | "DES" => Ok(QuestionType::Descriptive),
            "MATCH_THE_LOTS" | "MTL" => Ok(QuestionType::MatchTheLots),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Declared value type of a question parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Number,
    String,
}

/// An author-declared parameter of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionParameter {
    /// Parameter name, referenced from tags.
    pub name: String,
    /// Values a rendering may assign to this parameter.
    #[serde(default)]
    pub possible_values: Vec<String>,
    /// Declared value type.
    #[serde(rename = "type", default = "default_parameter_type")]
    pub kind: ParameterType,
}

fn default_parameter_type() -> ParameterType {
    ParameterType::String
}

/// A concrete value assigned to a parameter for one rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
}

impl ParameterValue {
    /// Numeric view of the value; text values are parsed if possible.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            ParameterValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Number(n) => write!(f, "{n}"),
            ParameterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(n: f64) -> Self {
        ParameterValue::Number(n)
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        ParameterValue::Text(s.to_string())
    }
}

/// One concrete parameter assignment, keyed by parameter name.
pub type ParameterMap = BTreeMap<String, ParameterValue>;

/// One selectable or orderable option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotItem {
    /// Identifier, unique within the owning question.
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub explanation: String,
}

/// A lot item together with its position in the correct ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotOrder {
    pub lot_item: LotItem,
    pub order: u32,
}

/// One row of a match-the-lots solution: items that belong together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    #[serde(rename = "match")]
    pub items: Vec<LotItem>,
}

/// Type-specific solution payload. The `type` tag selects the question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Solution {
    SelectOneInLot {
        correct_lot_item: LotItem,
        #[serde(default)]
        incorrect_lot_items: Vec<LotItem>,
    },
    SelectManyInLot {
        #[serde(default)]
        correct_lot_items: Vec<LotItem>,
        #[serde(default)]
        incorrect_lot_items: Vec<LotItem>,
    },
    OrderTheLots {
        #[serde(default)]
        ordering: Vec<LotOrder>,
    },
    /// Without an `expression` the answer is correct when, rounded to
    /// `decimal_precision` digits, it lies within the inclusive limits. With
    /// one, the limits must stay 0 and the rounded answer must equal the
    /// rounded value of the expression. `value` is shown, never graded.
    NumericAnswerType {
        #[serde(default)]
        decimal_precision: u32,
        #[serde(default)]
        upper_limit: f64,
        #[serde(default)]
        lower_limit: f64,
        #[serde(default)]
        value: Option<f64>,
        #[serde(default)]
        expression: Option<String>,
    },
    Descriptive {
        #[serde(default)]
        solution_text: String,
    },
    MatchTheLots {
        #[serde(default)]
        matches: Vec<MatchRow>,
    },
}

/// A stored question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    /// Raw question body, may contain tags.
    pub text: String,
    /// Raw hint, may contain tags.
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub is_parameterized: bool,
    #[serde(default)]
    pub parameters: Vec<QuestionParameter>,
    #[serde(default = "default_time_limit")]
    pub time_limit_seconds: u32,
    pub points: f64,
    #[serde(flatten)]
    pub solution: Solution,
}

fn default_time_limit() -> u32 {
    60
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match &self.solution {
            Solution::SelectOneInLot { .. } => QuestionType::SelectOneInLot,
            Solution::SelectManyInLot { .. } => QuestionType::SelectManyInLot,
            Solution::OrderTheLots { .. } => QuestionType::OrderTheLots,
            Solution::NumericAnswerType { .. } => QuestionType::NumericAnswerType,
            Solution::Descriptive { .. } => QuestionType::Descriptive,
            Solution::MatchTheLots { .. } => QuestionType::MatchTheLots,
        }
    }

    /// Every lot item owned by the question, incorrect items first for the
    /// select types. Empty for NAT and DES.
    pub fn lot_items(&self) -> Vec<&LotItem> {
        match &self.solution {
            Solution::SelectOneInLot {
                correct_lot_item,
                incorrect_lot_items,
            } => incorrect_lot_items
                .iter()
                .chain(std::iter::once(correct_lot_item))
                .collect(),
            Solution::SelectManyInLot {
                correct_lot_items,
                incorrect_lot_items,
            } => incorrect_lot_items
                .iter()
                .chain(correct_lot_items.iter())
                .collect(),
            Solution::OrderTheLots { ordering } => ordering.iter().map(|o| &o.lot_item).collect(),
            Solution::MatchTheLots { matches } => {
                matches.iter().flat_map(|m| m.items.iter()).collect()
            }
            Solution::NumericAnswerType { .. } | Solution::Descriptive { .. } => Vec::new(),
        }
    }
}

/// Quiz-level settings that influence grading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizContext {
    #[serde(default)]
    pub allow_partial_grading: bool,
}

/// A student's response, shaped by the question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    SelectOne { lot_item_id: String },
    SelectMany { lot_item_ids: Vec<String> },
    Order { ordering: Vec<String> },
    Numeric { value: f64 },
    Descriptive { answer_text: String },
    Match { matches: Vec<Vec<String>> },
}

impl Answer {
    /// Lot item ids the student picked, for the select types.
    pub fn selected_ids(&self) -> Vec<&str> {
        match self {
            Answer::SelectOne { lot_item_id } => vec![lot_item_id.as_str()],
            Answer::SelectMany { lot_item_ids } => {
                lot_item_ids.iter().map(String::as_str).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Grading outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackStatus {
    Correct,
    Partial,
    Incorrect,
    /// Left for a human reviewer.
    PendingReview,
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackStatus::Correct => write!(f, "CORRECT"),
            FeedbackStatus::Partial => write!(f, "PARTIAL"),
            FeedbackStatus::Incorrect => write!(f, "INCORRECT"),
            FeedbackStatus::PendingReview => write!(f, "PENDING_REVIEW"),
        }
    }
}

/// Result of grading one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub question_id: String,
    pub status: FeedbackStatus,
    pub score: f64,
    pub answer_feedback: String,
}

/// Answer-free projection of a question sent to a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderView {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub is_parameterized: bool,
    pub text: String,
    #[serde(default)]
    pub hint: Option<String>,
    pub points: f64,
    pub time_limit_seconds: u32,
    pub body: RenderBody,
    /// The exact assignment used, to be returned with the submission.
    #[serde(default)]
    pub parameter_map: Option<ParameterMap>,
}

/// Type-specific part of a [`RenderView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderBody {
    /// Shuffled lot items (SOL, SML, OTL).
    Lot { lot_items: Vec<LotItem> },
    Numeric {
        decimal_precision: u32,
        upper_limit: f64,
        lower_limit: f64,
        value: Option<f64>,
        expression: Option<String>,
    },
    Descriptive,
    /// Match table columns, each shuffled independently.
    Match { columns: Vec<Vec<LotItem>> },
}
