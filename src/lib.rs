mod codec;
mod error;
mod options;
mod record;
mod skiplist;
mod store;
mod types;

pub use error::{Error, Result};
pub use options::{Options, RetryPolicy};
pub use record::{MetaRecord, NodeRecord};
pub use skiplist::{Node, SkipList};
pub use store::mem::{MemStore, MemTxn, StoreStats};
pub use store::{Object, Store, Txn};
pub use types::{ObjectRef, Version};
