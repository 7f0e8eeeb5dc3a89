//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                        |
//! |------|-----------|----------------------------------------------------|
//! | 0    | Universal | Success: every key matched                         |
//! | 1    | Universal | General error (unspecified)                        |
//! | 2    | Universal | CLI usage error (bad args, unreadable config file) |
//! | 3    | recon     | Differences found                                  |
//! | 4    | recon     | Diagnostics present (`--fail-on-diagnostics`)      |
//! | 5    | recon     | Invalid config                                     |
//! | 6    | recon     | Input or schema error, run aborted                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use tally_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed and nothing needs attention.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing config file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-9)
// =============================================================================

/// At least one key is a mismatch, one-sided, or indeterminate.
pub const EXIT_RECON_DIFFERENCES: u8 = 3;

/// Diagnostics were reported and `--fail-on-diagnostics` is set.
pub const EXIT_RECON_DIAGNOSTICS: u8 = 4;

/// Config failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 5;

/// Input could not be read or does not have the configured shape.
pub const EXIT_RECON_INPUT: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::UnknownGroupField(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingKeyField { .. }
        | ReconError::MissingField { .. }
        | ReconError::KeyArityMismatch { .. }
        | ReconError::ValueParse { .. }
        | ReconError::Io(_) => EXIT_RECON_INPUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_recon::Side;

    #[test]
    fn config_errors_map_to_invalid_config() {
        assert_eq!(recon_exit_code(&ReconError::ConfigParse("x".into())), EXIT_RECON_INVALID_CONFIG);
        assert_eq!(
            recon_exit_code(&ReconError::ConfigValidation("x".into())),
            EXIT_RECON_INVALID_CONFIG
        );
    }

    #[test]
    fn schema_errors_map_to_input() {
        let err = ReconError::MissingKeyField { side: Side::Left, field: "id".into() };
        assert_eq!(recon_exit_code(&err), EXIT_RECON_INPUT);
        assert_eq!(recon_exit_code(&ReconError::Io("gone".into())), EXIT_RECON_INPUT);
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_RECON_DIFFERENCES,
            EXIT_RECON_DIAGNOSTICS,
            EXIT_RECON_INVALID_CONFIG,
            EXIT_RECON_INPUT,
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
