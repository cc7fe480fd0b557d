pub mod kv_store;

pub use kv_store::{FileKvStore, KeyValueStore, MemoryKvStore};
