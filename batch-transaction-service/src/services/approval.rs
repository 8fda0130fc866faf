//! Approval state machine.
//!
//! ```text
//! waiting_approval ──approve──▶ approved
//!        │
//!        └────────reject──────▶ rejected
//! ```
//!
//! The requested status is validated here. Whether the batch is still
//! `waiting_approval` is enforced by the store in the same statement that
//! writes the new status, so two racing approvers cannot both win.

use crate::models::TransactionStatus;
use crate::services::error::EngineError;

/// The only status an approver can act on.
pub const ACTIONABLE_STATUS: TransactionStatus = TransactionStatus::WaitingApproval;

/// Accepts `approved` or `rejected`; anything else, including
/// `waiting_approval`, is an invalid transition target.
pub fn validate_requested(raw: &str) -> Result<TransactionStatus, EngineError> {
    raw.parse::<TransactionStatus>()
        .ok()
        .filter(|status| ACTIONABLE_STATUS.can_transition_to(*status))
        .ok_or_else(|| EngineError::InvalidTransactionStatus(raw.to_string()))
}
