use offshore_models::{AnalysisKind, ParseLabelError, RiskProfileName, Table};
use offshore_store::GatewayError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::pdf::ReportError;

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("{0}")]
    NotFound(Missing),

    #[error("{0}")]
    Validation(#[from] Invalid),

    #[error("Backend error: {0}")]
    Backend(GatewayError),

    #[error("Incorrect administrator password")]
    Unauthorized,

    #[error("Report generation failed: {0}")]
    Report(#[from] ReportError),
}

/// Coarse classification used at the interaction boundary to pick a message style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Backend,
    Unauthorized,
    Report,
}

impl ResearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResearchError::NotFound(_) => ErrorKind::NotFound,
            ResearchError::Validation(_) => ErrorKind::Validation,
            ResearchError::Backend(_) => ErrorKind::Backend,
            ResearchError::Unauthorized => ErrorKind::Unauthorized,
            ResearchError::Report(_) => ErrorKind::Report,
        }
    }
}

impl From<GatewayError> for ResearchError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::RowNotFound { table, id } => {
                ResearchError::NotFound(Missing::Row { table, id })
            }
            other => ResearchError::Backend(other),
        }
    }
}

impl From<Missing> for ResearchError {
    fn from(missing: Missing) -> Self {
        ResearchError::NotFound(missing)
    }
}

/// A lookup that produced no row where one was expected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    #[error("Risk profile {0} not found in the database")]
    RiskProfile(RiskProfileName),

    #[error("No allocation strategy found for the {0} profile; please contact the administrator")]
    Allocation(RiskProfileName),

    #[error("No {table} row with id {id}")]
    Row { table: Table, id: i64 },
}

/// Input that breaks a business rule. Nothing is written when one is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Invalid {
    #[error("Component percentages sum to {sum}%, expected between 99.9% and 100.1%")]
    PercentageSum { sum: Decimal },

    #[error("Component {asset:?} has a negative percentage")]
    NegativePercentage { asset: String },

    #[error("The {0} profile already has a model allocation")]
    DuplicateAllocation(RiskProfileName),

    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("{kind} analyses require {field}")]
    MissingField {
        kind: AnalysisKind,
        field: &'static str,
    },

    #[error("{kind} analyses must not carry {field}")]
    ForbiddenField {
        kind: AnalysisKind,
        field: &'static str,
    },

    #[error("Question {question} has no option {index}")]
    OptionOutOfRange { question: usize, index: usize },

    #[error(transparent)]
    Label(#[from] ParseLabelError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: ResearchError = GatewayError::RowNotFound {
            table: Table::Analyses,
            id: 4,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "No analyses row with id 4");
    }

    #[test]
    fn other_gateway_errors_are_backend_errors() {
        let err: ResearchError = GatewayError::Unavailable("down".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn missing_profile_and_missing_allocation_read_differently() {
        let profile = Missing::RiskProfile(RiskProfileName::Moderate).to_string();
        let allocation = Missing::Allocation(RiskProfileName::Moderate).to_string();
        assert_ne!(profile, allocation);
        assert!(profile.contains("Moderate"));
        assert!(allocation.contains("contact the administrator"));
    }

    #[test]
    fn percentage_message_carries_current_sum() {
        let err: ResearchError = Invalid::PercentageSum { sum: dec!(99.0) }.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("99.0%"));
    }
}
