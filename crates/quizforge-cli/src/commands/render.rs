//! The `quizforge render` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use quizforge_core::QuestionProcessor;

use super::{load_question, parse_params};

pub fn execute(bank_path: PathBuf, question_id: String, params: Option<String>) -> Result<()> {
    let (_, question) = load_question(&bank_path, &question_id)?;
    let params = parse_params(params.as_deref())?;

    let view = QuestionProcessor::default()
        .render_question(&question, params.as_ref())
        .with_context(|| format!("failed to render question '{question_id}'"))?;

    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
