//! Attempt reports with JSON persistence.
//!
//! The core never stores which parameter assignment a student saw. An
//! attempt report keeps each rendered view (and with it the parameter map)
//! next to the answer and feedback so the attempt can be re-graded later.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Answer, Feedback, FeedbackStatus, RenderView};

/// One student's pass over a bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the attempt started.
    pub created_at: DateTime<Utc>,
    pub bank_id: String,
    pub entries: Vec<AttemptEntry>,
    /// Sum of feedback scores recorded so far.
    pub total_score: f64,
    /// Sum of points over every rendered question.
    pub max_score: f64,
}

/// A served question and, once submitted, its answer and feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptEntry {
    pub view: RenderView,
    #[serde(default)]
    pub answer: Option<Answer>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

impl AttemptReport {
    pub fn new(bank_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            bank_id: bank_id.into(),
            entries: Vec::new(),
            total_score: 0.0,
            max_score: 0.0,
        }
    }

    /// Record a view served to the student.
    pub fn push_view(&mut self, view: RenderView) {
        self.max_score += view.points;
        self.entries.push(AttemptEntry {
            view,
            answer: None,
            feedback: None,
        });
    }

    /// Attach an answer and its feedback to the entry for `feedback.question_id`.
    /// Re-recording replaces the earlier feedback and its score.
    pub fn record_feedback(&mut self, answer: Answer, feedback: Feedback) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.view.id == feedback.question_id)
            .with_context(|| {
                format!(
                    "question {} was not served in this attempt",
                    feedback.question_id
                )
            })?;

        if let Some(previous) = entry.feedback.take() {
            self.total_score -= previous.score;
        }
        self.total_score += feedback.score;
        entry.answer = Some(answer);
        entry.feedback = Some(feedback);
        Ok(())
    }

    /// Number of entries awaiting manual review.
    pub fn pending_review(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                e.feedback
                    .as_ref()
                    .is_some_and(|f| f.status == FeedbackStatus::PendingReview)
            })
            .count()
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse report JSON")
    }
}
