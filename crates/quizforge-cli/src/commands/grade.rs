//! The `quizforge grade` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use quizforge_core::grade::selected_item_texts;
use quizforge_core::report::AttemptReport;
use quizforge_core::{Answer, QuestionProcessor, QuizContext};

use super::{load_question, parse_params};
use crate::config::load_config_from;

pub struct GradeArgs {
    pub bank: PathBuf,
    pub question: String,
    pub answer: String,
    pub params: Option<String>,
    pub partial: bool,
    pub save: bool,
    pub config: Option<PathBuf>,
}

pub fn execute(args: GradeArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    let (bank, question) = load_question(&args.bank, &args.question)?;
    let params = parse_params(args.params.as_deref())?;
    if args.save && question.is_parameterized && params.is_none() {
        anyhow::bail!(
            "--save on parameterized question '{}' requires --params",
            question.id
        );
    }
    let answer: Answer = serde_json::from_str(&args.answer)
        .with_context(|| format!("failed to parse answer JSON: {}", args.answer))?;

    let context = QuizContext {
        allow_partial_grading: args.partial || config.allow_partial_grading,
    };
    let processor = QuestionProcessor::default();
    let selected = selected_item_texts(&question, &answer);

    let feedback = processor
        .grade_question(
            &question,
            &answer,
            &context,
            params.as_ref(),
            Some(selected.as_slice()),
        )
        .with_context(|| format!("failed to grade question '{}'", question.id))?;

    println!("{}", serde_json::to_string_pretty(&feedback)?);

    if args.save {
        let view = processor
            .render_question(&question, params.as_ref())
            .with_context(|| format!("failed to render question '{}'", question.id))?;
        let mut report = AttemptReport::new(&bank.id);
        report.push_view(view);
        report.record_feedback(answer, feedback)?;

        let path = config.output_dir.join(format!("{}.json", report.id));
        report.save_json(&path)?;
        tracing::info!("attempt report saved to {}", path.display());
    }

    Ok(())
}
