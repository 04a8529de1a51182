//! Error types for the ipatlas library

use crate::addr::IpFamily;
use std::fmt;

/// Result type alias for atlas operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Main error type for atlas operations
///
/// Note that a lookup landing in an unallocated gap is *not* an error;
/// resolution returns `Ok(None)` for that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    /// Malformed textual address in query input
    InvalidAddress(String),

    /// A country code that is neither ISO-3166-1 alpha-2 nor the `??` sentinel
    InvalidCountryCode(String),

    /// Caller asserted one address family but supplied an address of the other
    FamilyMismatch {
        /// The family the caller asserted
        expected: IpFamily,
        /// The family the address actually belongs to
        actual: IpFamily,
    },

    /// The raw record sequence was empty
    EmptyInput,

    /// A raw allocation record failed validation (fatal to the build)
    InvalidRecord(String),

    /// Overlapping records encountered under the `Reject` policy
    OverlappingRecords(String),

    /// Acquiring raw records from a source failed
    Fetch(String),

    /// A snapshot failed integrity or format validation on load
    CorruptDataset(String),

    /// I/O errors
    Io(String),
}

impl fmt::Display for AtlasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtlasError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            AtlasError::InvalidCountryCode(msg) => write!(f, "Invalid country code: {}", msg),
            AtlasError::FamilyMismatch { expected, actual } => {
                write!(f, "Family mismatch: expected {}, got {}", expected, actual)
            }
            AtlasError::EmptyInput => write!(f, "No raw records to normalize"),
            AtlasError::InvalidRecord(msg) => write!(f, "Invalid record: {}", msg),
            AtlasError::OverlappingRecords(msg) => write!(f, "Overlapping records: {}", msg),
            AtlasError::Fetch(msg) => write!(f, "Fetch error: {}", msg),
            AtlasError::CorruptDataset(msg) => write!(f, "Corrupt dataset: {}", msg),
            AtlasError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for AtlasError {}

impl From<std::io::Error> for AtlasError {
    fn from(err: std::io::Error) -> Self {
        AtlasError::Io(err.to_string())
    }
}
