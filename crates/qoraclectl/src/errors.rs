//! Exit codes for qoraclectl

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors (config, backend, IO)
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when the offering is too short to read
pub const EXIT_INSUFFICIENT_INPUT: i32 = 65;

/// Shown when the offering is too short
pub const INSUFFICIENT_INPUT_PROMPT: &str =
    "The Oracle requires an offering (input) to speak. Share a little more.";
