//! Physical store subsystem
//!
//! The protocol the engine speaks to the single shared table, the wire value
//! type, the connection descriptor, and an in-process emulator used for local
//! runs and tests.
//!
//! # Protocol
//!
//! - `put_item(item)` - full replace by `pk`/`sk`
//! - `get_item(key)` - exact table key
//! - `query(index, partition, sort?, cursor?, limit?)` - one page
//! - `scan(cursor?, limit?)` - one page of the whole table
//! - `delete_item(key)`
//!
//! The store is shared external state. Nothing here locks across calls,
//! checks versions, or retries.

mod attribute;
mod connection;
mod errors;
mod memory;
mod table;

pub use attribute::{AttributeValue, StoreItem};
pub use connection::{connect, Connection, Credentials};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryTable;
pub use table::{
    index_name, index_number, is_index_attribute, partition_attribute, sort_attribute, Page,
    QueryRequest, ScanRequest, SortCondition, TableKey, TableStore, MAX_SECONDARY_INDEXES,
    PRIMARY_INDEX,
};
