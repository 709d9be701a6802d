pub mod grade;
pub mod init;
pub mod render;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use quizforge_core::bank::{parse_bank, QuestionBank};
use quizforge_core::{ParameterMap, Question};

/// Load `bank_path` and pull out question `id`.
fn load_question(bank_path: &Path, id: &str) -> Result<(QuestionBank, Question)> {
    let bank = parse_bank(bank_path)?;
    let question = bank
        .question(id)
        .cloned()
        .with_context(|| format!("question '{id}' not found in bank '{}'", bank.id))?;
    Ok((bank, question))
}

/// Parse a `--params` JSON object.
fn parse_params(params: Option<&str>) -> Result<Option<ParameterMap>> {
    params
        .map(|json| serde_json::from_str(json).context("--params must be a JSON object"))
        .transpose()
}
