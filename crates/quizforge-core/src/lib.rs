//! quizforge-core — Parameterized quiz questions: inline tags, validation,
//! rendering, and grading.
//!
//! Question text carries inline tags such as `<QParam>x</QParam>` or
//! `<NumExpr>a * b</NumExpr>`. The [`TagParser`] resolves them against a
//! [`ParameterMap`]; [`QuestionProcessor`] ties validation, rendering, and
//! grading together for the six question types.

pub mod bank;
pub mod error;
pub mod expr;
pub mod grade;
pub mod model;
pub mod params;
pub mod processor;
pub mod render;
pub mod report;
pub mod tag_parser;
pub mod tags;
pub mod validate;

pub use error::{DataIntegrityError, QuizError, ValidationError};
pub use model::{Answer, Feedback, FeedbackStatus, ParameterMap, Question, QuizContext, RenderView};
pub use processor::QuestionProcessor;
pub use tag_parser::TagParser;
pub use tags::{TagProcessor, TagRegistry};
