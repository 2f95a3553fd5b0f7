// ⚠️ Error types
//
// Two families:
// - RejectReason: why a single owner candidate was dropped. Never aborts a run,
//   it ends up in the invalid_owners audit list.
// - ResolveError: boundary failures (unreadable documents, config, archive, output).

use thiserror::Error;

// ============================================================================
// CANDIDATE REJECTIONS (recovered locally)
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Text matches neither a person nor a company shape
    #[error("unclassifiable: {0}")]
    Unclassifiable(String),

    /// Not enough tokens to form first + last name
    #[error("incomplete person: {0}")]
    IncompletePerson(String),

    #[error("invalid first_name: {0:?} does not match name pattern")]
    InvalidFirstName(String),

    #[error("invalid last_name: {0:?} does not match name pattern")]
    InvalidLastName(String),

    #[error("empty company name")]
    EmptyCompanyName,
}

impl RejectReason {
    /// Stable category label used for audit summaries
    pub fn category(&self) -> &'static str {
        match self {
            RejectReason::Unclassifiable(_) => "unclassifiable",
            RejectReason::IncompletePerson(_) => "incomplete_person",
            RejectReason::InvalidFirstName(_) | RejectReason::InvalidLastName(_) => {
                "invalid_name_pattern"
            }
            RejectReason::EmptyCompanyName => "empty_company",
        }
    }
}

// ============================================================================
// BOUNDARY ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("archive error: {0}")]
    Archive(#[from] rusqlite::Error),

    #[error("invalid pattern in vocabulary: {0}")]
    Pattern(#[from] regex::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported source document: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_reason_display() {
        let reason = RejectReason::IncompletePerson("single token".to_string());
        assert_eq!(reason.to_string(), "incomplete person: single token");
        assert_eq!(reason.category(), "incomplete_person");
    }

    #[test]
    fn test_name_pattern_failures_share_category() {
        assert_eq!(
            RejectReason::InvalidFirstName("1st".to_string()).category(),
            RejectReason::InvalidLastName("x1".to_string()).category()
        );
    }
}
