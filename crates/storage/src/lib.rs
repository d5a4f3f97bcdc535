//! Persistent key/value storage with optional per-entry expiration.
//!
//! Used by the client to cache identity and session values across launches.

pub mod error;
pub mod kv;

pub use {
    error::{Error, Result},
    kv::KvStore,
};
