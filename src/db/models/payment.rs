//! Payment claims and the review state machine.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub phone_number: String,
    pub user_email: Option<String>,
    pub status: String,
    pub created_at: String,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
}

impl Payment {
    pub fn status(&self) -> PaymentStatus {
        self.status.parse().unwrap_or(PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" => Ok(PaymentStatus::Approved),
            "rejected" => Ok(PaymentStatus::Rejected),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(format!("Unknown payment status: {other}")),
        }
    }
}

/// Admin review actions. `Approve` doubles as "reactivate" when applied to a
/// rejected or cancelled claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
    Cancel,
}

impl ReviewAction {
    pub fn target(&self) -> PaymentStatus {
        match self {
            ReviewAction::Approve => PaymentStatus::Approved,
            ReviewAction::Reject => PaymentStatus::Rejected,
            ReviewAction::Cancel => PaymentStatus::Cancelled,
        }
    }

    pub fn allowed_from(&self, from: PaymentStatus) -> bool {
        match self {
            ReviewAction::Approve => matches!(
                from,
                PaymentStatus::Pending | PaymentStatus::Rejected | PaymentStatus::Cancelled
            ),
            ReviewAction::Reject => from == PaymentStatus::Pending,
            ReviewAction::Cancel => from == PaymentStatus::Approved,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitPaymentRequest {
    pub phone_number: String,
}

/// Learner-facing view of their latest claim for a course, plus the
/// mobile-money number to send funds to.
#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub payment: Option<Payment>,
    pub receiver_number: String,
}

/// Admin review listing: payment joined with its course title.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentWithCourse {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub course_title: String,
    pub phone_number: String,
    pub user_email: Option<String>,
    pub status: String,
    pub created_at: String,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Approved,
            PaymentStatus::Rejected,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn approve_covers_reactivation() {
        assert!(ReviewAction::Approve.allowed_from(PaymentStatus::Pending));
        assert!(ReviewAction::Approve.allowed_from(PaymentStatus::Rejected));
        assert!(ReviewAction::Approve.allowed_from(PaymentStatus::Cancelled));
        assert!(!ReviewAction::Approve.allowed_from(PaymentStatus::Approved));
    }

    #[test]
    fn reject_only_from_pending() {
        assert!(ReviewAction::Reject.allowed_from(PaymentStatus::Pending));
        assert!(!ReviewAction::Reject.allowed_from(PaymentStatus::Approved));
        assert!(!ReviewAction::Reject.allowed_from(PaymentStatus::Rejected));
        assert!(!ReviewAction::Reject.allowed_from(PaymentStatus::Cancelled));
    }

    #[test]
    fn cancel_only_from_approved() {
        assert!(ReviewAction::Cancel.allowed_from(PaymentStatus::Approved));
        assert!(!ReviewAction::Cancel.allowed_from(PaymentStatus::Pending));
        assert!(!ReviewAction::Cancel.allowed_from(PaymentStatus::Cancelled));
    }
}
