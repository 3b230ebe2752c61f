//! CLI exit code registry.
//!
//! Single source of truth for the shell contract; scripts rely on these.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success                                            |
//! | 1    | General error (unspecified)                        |
//! | 2    | Usage or configuration error (bad args, bad keys)  |
//! | 3    | Cardinality validation failed                      |
//! | 4    | Input parse error (broken CSV)                     |
//! | 5    | File IO error (missing or unwritable file)         |

use collate_engine::MergeError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage or configuration error - bad arguments, missing columns,
/// unknown tokens.
pub const EXIT_CONFIG: u8 = 2;

/// The declared cardinality contract was violated by the data.
pub const EXIT_VALIDATION: u8 = 3;

/// Structurally broken input (CSV parse failure).
pub const EXIT_PARSE: u8 = 4;

/// File IO failure.
pub const EXIT_IO: u8 = 5;

/// Map an engine error to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::ConfigParse(_)
        | MergeError::ConfigValidation(_)
        | MergeError::EmptyJoinKeys
        | MergeError::JoinKeysMissing { .. }
        | MergeError::DedupeKeysMissing { .. }
        | MergeError::NameCollision { .. }
        | MergeError::UnknownStrategy { .. }
        | MergeError::IndicatorMissing => EXIT_CONFIG,
        MergeError::Cardinality { .. } => EXIT_VALIDATION,
        MergeError::Csv(_)
        | MergeError::DuplicateColumn(_)
        | MergeError::RaggedColumns { .. } => EXIT_PARSE,
        MergeError::Io(_) => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_usage() {
        assert_eq!(merge_exit_code(&MergeError::EmptyJoinKeys), EXIT_CONFIG);
        assert_eq!(
            merge_exit_code(&MergeError::UnknownStrategy {
                column: "city".into(),
                strategy: "middle".into(),
            }),
            EXIT_CONFIG
        );
    }

    #[test]
    fn io_and_parse_have_their_own_codes() {
        assert_eq!(merge_exit_code(&MergeError::Io("x".into())), EXIT_IO);
        assert_eq!(merge_exit_code(&MergeError::Csv("x".into())), EXIT_PARSE);
    }
}
