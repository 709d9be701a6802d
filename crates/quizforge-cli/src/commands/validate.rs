//! The `quizforge validate` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};
use quizforge_core::bank::{lint_bank, load_banks};
use quizforge_core::QuestionProcessor;

use crate::config::load_config_from;

pub fn execute(bank_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let bank_path = match bank_path {
        Some(path) => path,
        None => load_config_from(config_path.as_deref())?.banks_dir,
    };
    let banks = load_banks(&bank_path)?;
    let processor = QuestionProcessor::default();

    let mut total_warnings = 0;
    let mut failures = 0;

    for bank in &banks {
        println!("Bank: {} ({} questions)", bank.name, bank.questions.len());

        let warnings = lint_bank(bank);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();

        if bank.questions.is_empty() {
            continue;
        }

        let mut table = Table::new();
        table.set_header(vec!["Question", "Type", "Params", "Status"]);
        for question in &bank.questions {
            let status = match processor.validate_question(question) {
                Ok(()) => "ok".to_string(),
                Err(e) => {
                    failures += 1;
                    format!("invalid: {e}")
                }
            };
            table.add_row(vec![
                Cell::new(&question.id),
                Cell::new(question.question_type().code()),
                Cell::new(question.parameters.len()),
                Cell::new(status),
            ]);
        }
        println!("{table}");
    }

    if failures > 0 {
        anyhow::bail!("{failures} question(s) failed validation");
    }

    if total_warnings == 0 {
        println!("All question banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
