//! Shared helpers for the CLI commands

use ipatlas::AtlasError;

/// Map an error to its process exit code
///
/// Exit code 1 is reserved for a well-formed query that found nothing, so
/// scripts can tell "not in the dataset" from actual failures.
pub fn exit_code(err: &AtlasError) -> i32 {
    match err {
        AtlasError::InvalidAddress(_) => 2,
        AtlasError::FamilyMismatch { .. } => 3,
        AtlasError::CorruptDataset(_) => 4,
        AtlasError::Fetch(_)
        | AtlasError::InvalidRecord(_)
        | AtlasError::InvalidCountryCode(_)
        | AtlasError::OverlappingRecords(_)
        | AtlasError::EmptyInput => 5,
        AtlasError::Io(_) => 6,
    }
}

/// Print the error and exit with its mapped code
pub fn fail(err: AtlasError) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(exit_code(&err));
}

/// Unwrap a library result or exit with the mapped code
pub fn or_fail<T>(result: ipatlas::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => fail(err),
    }
}
