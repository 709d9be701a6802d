//! Question engine error types.
//!
//! Authoring-time failures are [`ValidationError`]s and map to a bad request.
//! Render/grade-time failures caused by a structurally broken stored question
//! are [`DataIntegrityError`]s and map to a server-side failure. A wrong
//! answer is never an error.

use thiserror::Error;

use crate::model::QuestionType;

/// Errors raised while validating a question at authoring time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A parameterized question has no recognized tag in its text.
    #[error("parameterized question must have a valid tag in the question text")]
    MissingTag,

    /// Parameters were declared on a question that is not parameterized.
    #[error("question is not parameterized, but has parameters defined")]
    ParametersOnNonParameterized,

    /// A parameterized question declares no parameters.
    #[error("question is parameterized, but has no parameters defined")]
    NoParameters,

    /// Two parameters share a name.
    #[error("duplicate parameter name: {0}")]
    DuplicateParameter(String),

    /// A `QParam` tag references a parameter that was never declared.
    #[error("tag references undeclared parameter '{0}'")]
    UnknownParameter(String),

    /// A declared parameter is not referenced by a `QParam` tag in the text.
    #[error("question text must include parameter '{0}' enclosed in <QParam> tags")]
    ParameterNotReferenced(String),

    /// An expression uses a parameter that is not declared as numeric.
    #[error("variable '{variable}' in expression '{expression}' must be a number parameter")]
    NonNumericParameter {
        expression: String,
        variable: String,
    },

    /// An expression could not be parsed.
    #[error("invalid math expression '{expression}': {reason}")]
    MalformedExpression { expression: String, reason: String },

    /// Lot item identifiers are not unique within the question.
    #[error("duplicate lot item id: {0}")]
    DuplicateLotItemId(String),

    /// A parameterized lot-based question has no tag in any lot item.
    #[error("at least one lot item must contain a valid tag")]
    LotItemsMissingTag,

    /// A lot-based question has nothing to choose from.
    #[error("{0} question must have at least one lot item")]
    EmptyLot(QuestionType),

    /// A numeric question's lower limit is above its upper limit.
    #[error("lower limit {lower} is greater than upper limit {upper}")]
    InvalidBounds { lower: f64, upper: f64 },

    /// A numeric question stores both an expression and non-zero bounds.
    #[error("numeric question with an expression must leave its limits at 0, got [{lower}, {upper}]")]
    BoundsWithExpression { lower: f64, upper: f64 },

    /// A select-many question has no correct lot items.
    #[error("select-many question must have at least one correct lot item")]
    NoCorrectLotItems,
}

/// Errors raised when a stored question cannot be rendered or graded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataIntegrityError {
    /// The question has no lot items, ordering entries, or match rows.
    #[error("question {question_id} has no {what}")]
    Empty {
        question_id: String,
        what: &'static str,
    },

    /// The stored NAT expression could not be evaluated.
    #[error("question {question_id}: cannot evaluate expression '{expression}': {reason}")]
    Expression {
        question_id: String,
        expression: String,
        reason: String,
    },
}

/// Umbrella error returned by the question processor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuizError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),

    /// The submitted answer has the wrong shape for the question type.
    #[error("answer does not match question type {expected}")]
    AnswerMismatch { expected: QuestionType },
}

impl QuizError {
    /// Returns `true` if the error was caused by client input rather than
    /// stored data.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            QuizError::Validation(_) | QuizError::AnswerMismatch { .. }
        )
    }
}
