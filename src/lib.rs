//! singletable - schema-driven entities over a single wide-column table
//!
//! Arbitrary application entities share one physical table with a primary
//! index and up to four secondary indexes. Each entity declares a schema and
//! its indexes once; the engine plans physical keys, applies computed fields,
//! validates writes and hides multi-page reads behind one cursor.
//!
//! Data flows one way: entity → engine → index planner / computed fields /
//! schema mapper → store.

pub mod cli;
pub mod compute;
pub mod engine;
pub mod entity;
pub mod index;
pub mod item;
pub mod schema;
pub mod store;
