//! Storage engine subsystem
//!
//! put/get/list/delete for one entity over the shared table.
//!
//! # Write path
//!
//! 1. Look up the stored record the item resolves to
//! 2. Create when none exists or the primary key changed, push otherwise
//! 3. Apply computed fields in registration order
//! 4. Validate the derived record strictly; report every failing field
//! 5. Encode, stamp the index attributes, upsert by primary key
//! 6. Read back by primary key and return the stored record
//!
//! # Read path
//!
//! The first declared index the item resolves wins. An item no index
//! resolves yields an empty result. Pages are fetched sequentially and a
//! failure on any page fails the whole call; nothing is retried.

mod codec;
mod cursor;
mod engine;
mod errors;
mod options;

pub use codec::{decode_item, encode_item};
pub use cursor::{Cursor, SCAN_INDEX};
pub use engine::{EngineConfig, StorageEngine};
pub use errors::{EngineError, EngineResult};
pub use options::{ListOptions, ListResult};
