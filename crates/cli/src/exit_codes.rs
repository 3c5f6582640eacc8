//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success, including a sheet with no ruleset               |
//! | 1    | Mismatches found                                         |
//! | 2    | CLI usage error (bad args)                               |
//! | 3    | I/O error (cannot read sheet, rules dir, or write output) |
//! | 4    | Sheet parse error (malformed CSV, missing header)        |
//! | 5    | Invalid ruleset configuration                            |
//! | 6    | Period selection problem                                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed. Also used when a sheet has no ruleset.
pub const EXIT_SUCCESS: u8 = 0;

/// At least one reported value disagrees with its recomputed value.
/// Like `diff(1)`, exit 1 means "sheet differs."
pub const EXIT_MISMATCH: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read an input file or write an output file.
pub const EXIT_IO: u8 = 3;

/// Sheet could not be parsed (bad CSV, header row out of range).
pub const EXIT_PARSE: u8 = 4;

/// A ruleset failed to parse or validate, or two rulesets conflict.
pub const EXIT_INVALID_RULESET: u8 = 5;

/// Period column missing a requested value, or several periods and none chosen.
pub const EXIT_PERIOD: u8 = 6;
