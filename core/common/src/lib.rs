//! Common utilities and types shared across tubeup crates.
//!
//! The error type here is the single failure vocabulary of the workspace:
//! every library operation returns [`Result`], and the binaries turn the
//! error's [`ErrorCategory`] into the message printed for the user.

pub mod error;

pub use error::{Error, ErrorCategory, Result};
