//! Data models for flowdoctor.
//!
//! These types are read-only projections of the automation platform's JSON
//! documents. They deserialize leniently: missing or null collections
//! default to empty and unmodelled automation fields are carried through,
//! so a partially populated record still produces something the diagnoser
//! can work with.

pub mod automation;
pub mod builders;
pub mod execution;
mod lenient;

pub use automation::{AutomationRecord, Definition, NodeRecord};
pub use builders::{AutomationBuilder, ExecutionBuilder};
pub use execution::{ExecutionRecord, ExecutionStatus, LogEntry};
