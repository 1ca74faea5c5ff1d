//! Faculty submission records and their decision state machine.
//!
//! # Responsibility
//! - Define the `Submission` record and its status lifecycle.
//! - Apply approve/reject transitions with mutually-exclusive audit metadata.
//!
//! # Invariants
//! - A stored submission is always `Pending`, `Approved` or `Rejected`;
//!   "not submitted" is a display value synthesized by callers when no
//!   submission exists for a course key.
//! - After any transition exactly one of the approval/rejection metadata
//!   pairs is populated, never both.
//! - A superseded submission (newer one exists for the same key) is frozen.

use super::course::RecordId;
use serde::{Deserialize, Serialize};

/// Stored decision state of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Awaiting a department-head decision.
    Pending,
    Approved,
    /// Rejected but still re-decidable; stays in the pending queue.
    Rejected,
}

impl SubmissionStatus {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Department-head decision outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    Approve,
    Reject,
}

/// A rendered document produced by an instructor for one course at one
/// (unit, year, term) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: RecordId,
    pub course_id: RecordId,
    pub unit_id: Option<RecordId>,
    pub year: String,
    pub term: u8,
    pub author: String,
    pub title: String,
    /// Locator of the rendered bytes in the binary-file store.
    pub file_locator: Option<String>,
    pub status: SubmissionStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<i64>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Submission {
    /// Applies a decision to this submission.
    ///
    /// Approving clears rejection metadata and vice versa, so the record can
    /// never display both. Re-issuing the decision the submission already
    /// carries is a no-op (idempotent success).
    pub fn apply_decision(&mut self, outcome: DecisionOutcome, actor: &str, now: i64) {
        match outcome {
            DecisionOutcome::Approve => {
                if self.status == SubmissionStatus::Approved {
                    return;
                }
                self.status = SubmissionStatus::Approved;
                self.approved_by = Some(actor.to_string());
                self.approved_at = Some(now);
                self.rejected_by = None;
                self.rejected_at = None;
            }
            DecisionOutcome::Reject => {
                if self.status == SubmissionStatus::Rejected {
                    return;
                }
                self.status = SubmissionStatus::Rejected;
                self.rejected_by = Some(actor.to_string());
                self.rejected_at = Some(now);
                self.approved_by = None;
                self.approved_at = None;
            }
        }
        self.updated_at = now;
    }

    /// Whether this submission still belongs in the decision queue.
    pub fn awaits_decision(&self) -> bool {
        self.status != SubmissionStatus::Approved
    }
}
