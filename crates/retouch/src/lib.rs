//! `retouch` - Fix or translate selected text in place
//!
//! This library provides the operation pipeline behind the `retouch` binary:
//! read the current selection (directly or through the clipboard), mask
//! protected words, hand the text to a transformer, restore the words and
//! write the result back without losing the user's clipboard.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod acquire;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod masking;
pub mod notify;
pub mod operation;
pub mod orchestrator;
pub mod platform;
pub mod replace;
pub mod storage;
pub mod timing;
pub mod transform;
pub mod words;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use operation::{OperationKind, OperationOutcome, OperationRecord};
pub use orchestrator::Orchestrator;
pub use storage::{Storage, StorageStats};
pub use words::ProtectedWord;
