use thiserror::Error;

use crate::types::{Capability, CostSheetStatus, Role};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CostSheetError {
    #[error("validation failed for {field}: {message}")]
    Validation {
        field: String,
        message: String,
    },

    #[error("invalid transition: cannot {event} a sheet in status {from}")]
    InvalidTransition {
        from: CostSheetStatus,
        event: String,
    },

    #[error("insufficient privilege: role {role} lacks the {capability} capability")]
    InsufficientPrivilege {
        role: Role,
        capability: Capability,
    },

    #[error("concurrency conflict on {id}: expected version {expected}, found {found}")]
    ConcurrencyConflict {
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("cost sheet is not approved: current status is {status}")]
    NotApproved {
        status: CostSheetStatus,
    },

    #[error("notification failed: {message}")]
    Notification {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

impl CostSheetError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CostSheetError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// true for version conflicts, which the caller should retry after refetching
    pub fn is_retryable(&self) -> bool {
        matches!(self, CostSheetError::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, CostSheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CostSheetError::InvalidTransition {
            from: CostSheetStatus::Approved,
            event: "edit".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid transition: cannot edit a sheet in status APPROVED"
        );

        let err = CostSheetError::InsufficientPrivilege {
            role: Role::Admin,
            capability: Capability::Approve,
        };
        assert_eq!(
            err.to_string(),
            "insufficient privilege: role admin lacks the approve capability"
        );
    }

    #[test]
    fn test_retryable() {
        let conflict = CostSheetError::ConcurrencyConflict {
            id: "sheet".to_string(),
            expected: 1,
            found: 2,
        };
        assert!(conflict.is_retryable());
        assert!(!CostSheetError::validation("remarks", "required").is_retryable());
    }
}
