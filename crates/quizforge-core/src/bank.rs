//! TOML question bank loader.
//!
//! A bank file has a `[bank]` header and any number of `[[questions]]`
//! tables. Solution fields sit inline next to the question fields and the
//! `type` key selects the question type.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{LotItem, Question, Solution};

/// A named collection of questions loaded from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
}

impl QuestionBank {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

/// Parse a single bank file.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bank file: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse bank TOML from a string. Lot items without an `id` get a fresh one.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut questions = parsed.questions;
    for question in &mut questions {
        assign_missing_ids(question);
    }

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        questions,
    })
}

/// Recursively load every `.toml` bank under `dir`. Files that fail to
/// parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a single file or every bank under a directory.
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBank>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_bank(path)?])
    }
}

fn assign_missing_ids(question: &mut Question) {
    let assign = |item: &mut LotItem| {
        if item.id.trim().is_empty() {
            item.id = Uuid::new_v4().to_string();
        }
    };

    match &mut question.solution {
        Solution::SelectOneInLot {
            correct_lot_item,
            incorrect_lot_items,
        } => {
            assign(correct_lot_item);
            incorrect_lot_items.iter_mut().for_each(assign);
        }
        Solution::SelectManyInLot {
            correct_lot_items,
            incorrect_lot_items,
        } => {
            correct_lot_items
                .iter_mut()
                .chain(incorrect_lot_items.iter_mut())
                .for_each(assign);
        }
        Solution::OrderTheLots { ordering } => {
            ordering.iter_mut().for_each(|o| assign(&mut o.lot_item));
        }
        Solution::MatchTheLots { matches } => {
            matches
                .iter_mut()
                .flat_map(|m| m.items.iter_mut())
                .for_each(assign);
        }
        Solution::NumericAnswerType { .. } | Solution::Descriptive { .. } => {}
    }
}

/// A non-fatal issue found while linting a bank.
#[derive(Debug, Clone)]
pub struct LintWarning {
    pub question_id: Option<String>,
    pub message: String,
}

/// Check a bank for issues that question validation does not cover.
pub fn lint_bank(bank: &QuestionBank) -> Vec<LintWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(LintWarning {
            question_id: None,
            message: "bank has no questions".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for question in &bank.questions {
        let warn = |message: String| LintWarning {
            question_id: Some(question.id.clone()),
            message,
        };

        if !seen_ids.insert(&question.id) {
            warnings.push(warn(format!("duplicate question ID: {}", question.id)));
        }
        if question.text.trim().is_empty() {
            warnings.push(warn("question text is empty".into()));
        }
        if question.points <= 0.0 {
            warnings.push(warn(format!("points must be positive, got {}", question.points)));
        }
        if question.time_limit_seconds == 0 {
            warnings.push(warn("time limit is zero".into()));
        }
    }

    warnings
}
