//! `tally-recon`: Two-source keyed reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded record sets, deduplicates each side
//! by key, pairs them, computes per-field differences and classifies every
//! key. CSV loading and writing live in [`table`]; nothing else touches IO.

pub mod aggregate;
pub mod classify;
pub mod compare;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod key;
pub mod model;
pub mod reconcile;
pub mod table;
pub mod value;

pub use classify::IndeterminatePolicy;
pub use compare::FieldPair;
pub use config::{ReconConfig, SourceConfig};
pub use dedup::{dedup, dedup_by, Deduplicated, PreferOrder, TieBreak};
pub use engine::{aggregate, reconcile, reconcile_with, run, ReconOptions, Reconciliation};
pub use error::ReconError;
pub use key::{KeyComponent, KeySpec, KeyTransform};
pub use model::{
    AggregateRow, Diagnostic, FieldTotals, Key, ReconResult, ReconSummary, ReconciledRecord, Record,
    RecordSet, Side, Status, StatusCounts,
};
pub use value::{ColumnType, Number, Value};
