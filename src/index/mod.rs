//! Index planning subsystem
//!
//! Maps logical key fields onto the physical index attributes of the single
//! shared table and picks the index a partial item can be read through.
//!
//! # Conventions
//!
//! - Index 0 is the primary index; its fields identify a row uniquely
//! - Up to four secondary indexes, read via `gsi{N}pk` / `gsi{N}sk`
//! - Composite keys are joined with `#`; partitions carry the entity name
//! - Sort keys resolve as a prefix, never as an arbitrary subset

mod errors;
mod planner;

pub use errors::{IndexError, IndexResult};
pub use planner::{
    key_text, IndexDefinition, IndexPlanner, IndexSpec, IsolatedKey, KeyFields, PhysicalKey,
    KEY_SEPARATOR,
};
