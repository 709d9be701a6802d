//! Question processor: the single entry point for validate/render/grade.

use std::sync::Arc;

use rand::Rng;

use crate::error::QuizError;
use crate::grade;
use crate::model::{Answer, Feedback, ParameterMap, Question, QuizContext, RenderView};
use crate::render;
use crate::tag_parser::TagParser;
use crate::tags::TagRegistry;
use crate::validate;

/// Dispatches every question operation by question type.
///
/// Cheap to clone; clones share the same tag registry.
#[derive(Debug, Clone)]
pub struct QuestionProcessor {
    parser: TagParser,
}

impl QuestionProcessor {
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self {
            parser: TagParser::new(registry),
        }
    }

    /// Tag-level primitives for ad-hoc text resolution.
    pub fn tag_parser(&self) -> &TagParser {
        &self.parser
    }

    /// Authoring-time checks. Never partially applies anything.
    pub fn validate_question(&self, question: &Question) -> Result<(), QuizError> {
        validate::validate_question(question, &self.parser).map_err(|e| {
            tracing::debug!(question_id = %question.id, error = %e, "question rejected");
            QuizError::from(e)
        })
    }

    /// Student view of `question`. When the question is parameterized and no
    /// map is given, one is drawn at random and returned in the view.
    pub fn render_question(
        &self,
        question: &Question,
        parameter_map: Option<&ParameterMap>,
    ) -> Result<RenderView, QuizError> {
        self.render_question_with_rng(question, parameter_map, &mut rand::thread_rng())
    }

    pub fn render_question_with_rng<R: Rng + ?Sized>(
        &self,
        question: &Question,
        parameter_map: Option<&ParameterMap>,
        rng: &mut R,
    ) -> Result<RenderView, QuizError> {
        Ok(render::render_question_with_rng(
            question,
            &self.parser,
            parameter_map,
            rng,
        )?)
    }

    pub fn grade_question(
        &self,
        question: &Question,
        answer: &Answer,
        context: &QuizContext,
        parameter_map: Option<&ParameterMap>,
        selected_texts: Option<&[String]>,
    ) -> Result<Feedback, QuizError> {
        grade::grade_question(
            question,
            answer,
            context,
            parameter_map,
            selected_texts,
        )
    }
}

impl Default for QuestionProcessor {
    fn default() -> Self {
        Self::new(Arc::new(TagRegistry::standard()))
    }
}
