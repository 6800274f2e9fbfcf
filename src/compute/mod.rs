//! Computed fields
//!
//! Tagged pure functions `(candidate, stored, action) -> fields`, applied in
//! registration order before every write. Their output always overwrites what
//! the caller supplied for the same field.
//!
//! Defaults, installed when the schema declares the field:
//! - `id`: generated on create when absent
//! - `dateCreated`: stamped on create, carried forward on push
//! - `dateUpdated`: stamped on every write

mod defaults;
mod registry;

pub use defaults::{
    date_created_default, date_updated_default, id_default, install_defaults, monotonic_now,
    timestamp, uuid_generator, IdGenerator,
};
pub use registry::{Action, ComputedFieldRegistry, ComputedFn};
