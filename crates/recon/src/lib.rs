//! `mischeck-recon`: rule-driven reconciliation of vendor MIS billing sheets.
//!
//! Pure engine crate: receives an already-normalized dataset, recomputes each
//! financial column from a vendor ruleset, and returns mismatches, aggregates,
//! and ledger entries. No CLI or IO dependencies.

pub mod aggregate;
pub mod checks;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod evidence;
pub mod expr;
pub mod ledger;
pub mod mismatch;
pub mod model;
pub mod parse;
pub mod pivot;
pub mod predicate;
pub mod registry;
pub mod value;

pub use config::{FieldRule, Ruleset};
pub use engine::{check_sheet, run, sheet_outcome};
pub use error::{ReconError, RowError};
pub use evaluate::{evaluate, evaluate_dataset};
pub use expr::Expr;
pub use model::{Dataset, Expected, Mismatch, ReconReport, Row, SheetOutcome};
pub use registry::Registry;
pub use value::{resolve, Scalar};
