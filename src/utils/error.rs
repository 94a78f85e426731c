use crate::domain::model::Customer;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("A customer with this email/phone already exists")]
    DuplicateCustomer { existing: Box<Customer> },

    #[error("API request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API responded with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Daily submission limit reached: {message}")]
    QuotaExceeded { message: String },

    #[error("Agreement signing failed for work order {work_order_id}: {message}")]
    AgreementWorkflow { work_order_id: i64, message: String },

    #[error("The agreement must be read to the end before signing")]
    AgreementLocked,

    #[error("Agreement is not ready: {}", .unmet.join(", "))]
    AgreementIncomplete { unmet: Vec<String> },

    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("This work order has already been submitted")]
    AlreadySubmitted,

    #[error("Cannot apply {event} while on step {from}")]
    InvalidTransition { from: String, event: String },

    #[error("Configuration error in {field}: {message}")]
    Config { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Duplicate,
    Network,
    Quota,
    AgreementWorkflow,
    Workflow,
    Configuration,
    Storage,
}

impl IntakeError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        IntakeError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            IntakeError::Validation { .. }
            | IntakeError::AgreementLocked
            | IntakeError::AgreementIncomplete { .. } => ErrorCategory::Validation,
            IntakeError::DuplicateCustomer { .. } => ErrorCategory::Duplicate,
            IntakeError::Network(_) | IntakeError::Api { .. } => ErrorCategory::Network,
            IntakeError::QuotaExceeded { .. } => ErrorCategory::Quota,
            IntakeError::AgreementWorkflow { .. } => ErrorCategory::AgreementWorkflow,
            IntakeError::SubmissionInFlight
            | IntakeError::AlreadySubmitted
            | IntakeError::InvalidTransition { .. } => ErrorCategory::Workflow,
            IntakeError::Config { .. } => ErrorCategory::Configuration,
            IntakeError::Io(_) | IntakeError::Serialization(_) => ErrorCategory::Storage,
        }
    }

    /// Network-class failures leave the draft intact and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Network
    }

    pub fn user_message(&self) -> String {
        match self {
            IntakeError::Validation { message, .. } => message.clone(),
            IntakeError::DuplicateCustomer { .. } => {
                "A customer with this email/phone already exists. Use existing customer?"
                    .to_string()
            }
            IntakeError::Network(_) | IntakeError::Api { .. } => {
                format!("Request failed, please try again. ({})", self)
            }
            IntakeError::QuotaExceeded { message } => message.clone(),
            IntakeError::AgreementIncomplete { .. } => {
                "Please complete all required fields.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_follow_taxonomy() {
        assert_eq!(
            IntakeError::validation("phone", "Phone number must be 10 digits").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            IntakeError::QuotaExceeded {
                message: "limit".to_string()
            }
            .category(),
            ErrorCategory::Quota
        );
        assert_eq!(IntakeError::AgreementLocked.category(), ErrorCategory::Validation);
        assert_eq!(IntakeError::SubmissionInFlight.category(), ErrorCategory::Workflow);
    }

    #[test]
    fn test_only_network_errors_are_retryable() {
        let api = IntakeError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(api.is_retryable());
        assert!(!IntakeError::QuotaExceeded {
            message: "limit".to_string()
        }
        .is_retryable());
        assert!(!IntakeError::validation("email", "Invalid email address").is_retryable());
    }

    #[test]
    fn test_incomplete_agreement_lists_conditions() {
        let err = IntakeError::AgreementIncomplete {
            unmet: vec!["signature".to_string(), "acknowledgement".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Agreement is not ready: signature, acknowledgement"
        );
        assert_eq!(err.user_message(), "Please complete all required fields.");
    }
}
