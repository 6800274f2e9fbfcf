//! Entity models
//!
//! Typed CRUD over a [`StorageEngine`](crate::engine::StorageEngine).
//!
//! ```text
//! Detached ──set──▶ Populated ──create/push──▶ Persisted ──delete──▶ Deleted
//!                                                 ▲    │
//!                                                 └pull┘ (after outside writes)
//! ```
//!
//! `push` without `force` is a read-modify-write with no version check.
//! `exists` is true when any declared index finds a record.

mod errors;
mod instance;
mod model;

pub use errors::{EntityError, EntityResult};
pub use instance::{Entity, EntityState, PushOptions};
pub use model::{EntityList, EntityModel, EntityModelBuilder};
