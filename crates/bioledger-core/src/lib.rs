//! # bioledger-core
//!
//! The environment seams the audit ledger runs against, plus the stock
//! implementations of them.
//!
//! This crate provides:
//! - The three seam traits (`KvStore`, `Clock`, `Authenticator`)
//! - `MemoryStore` and `FileStore`
//! - `SystemClock` and `ManualClock`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bioledger_core::{store::FileStore, traits::KvStore};
//!
//! let store = FileStore::open("/var/lib/bioledger")?;
//! store.write("bioledger/system-lock/v1", b"{\"locked\":false}")?;
//! ```

pub mod clock;
pub mod store;
pub mod traits;

pub use clock::{ManualClock, SystemClock};
pub use store::{FileStore, MemoryStore};
