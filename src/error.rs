//! Error handling for the look-through pipeline
//!
//! Defines the typed error families used by the core (fetching,
//! normalization, position validation) and establishes a unified Result
//! type using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Fund-level fetch failures.
///
/// All three variants are terminal for a single fund: the driving loop
/// records them, excludes the fund from the aggregate and carries on with
/// the remaining positions.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The provider explicitly reported the fund as unknown ("no results"
    /// page). Never retried and never cached.
    #[error("fund '{fund_id}' not recognized by provider")]
    NotFound { fund_id: String },

    /// Transient failures outran the retry budget. The last transient
    /// cause is folded into the message (anyhow errors cannot be chained
    /// as a std source).
    #[error("giving up on '{fund_id}' after {attempts} attempt(s): {last_cause}")]
    Exhausted {
        fund_id: String,
        attempts: u32,
        last_cause: anyhow::Error,
    },

    /// The holdings table arrived but was unusable as a whole.
    #[error("holdings for '{fund_id}' failed normalization")]
    Malformed {
        fund_id: String,
        #[source]
        source: NormalizationError,
    },
}

impl FetchError {
    /// The fund identifier the failure belongs to.
    pub fn fund_id(&self) -> &str {
        match self {
            FetchError::NotFound { fund_id }
            | FetchError::Exhausted { fund_id, .. }
            | FetchError::Malformed { fund_id, .. } => fund_id,
        }
    }
}

/// Row- and fund-level normalization failures.
///
/// `InvalidWeight` and `EmptyCompanyName` are per-row diagnostics: the row
/// is dropped and counted. `ExcessiveDrops` escalates the whole fund when
/// the dropped fraction passes the configured threshold.
#[derive(Error, Debug)]
pub enum NormalizationError {
    #[error("row {row}: weight '{value}' is not a percentage in [0,100]")]
    InvalidWeight { row: usize, value: String },

    #[error("row {row}: empty company name")]
    EmptyCompanyName { row: usize },

    #[error("{dropped} of {total} holding rows dropped, holdings rejected")]
    ExcessiveDrops { dropped: usize, total: usize },
}

/// Fatal position-file problems, reported before any fetching begins.
#[derive(Error, Debug)]
pub enum PositionError {
    #[error("position '{fund_id}': shares must be positive (got {value})")]
    NonPositiveShares { fund_id: String, value: String },

    #[error("position '{fund_id}': price must be positive (got {value})")]
    NonPositivePrice { fund_id: String, value: String },

    #[error("position with empty fund identifier")]
    EmptyFundId,
}

/// Result type alias for look-through operations
pub type Result<T> = anyhow::Result<T>;
