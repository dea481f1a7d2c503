//! Command-line front ends for tubeup.
//!
//! Each binary parses its arguments, installs logging and calls one `run`
//! function. A `run` reports every failure on the writer it is given
//! (stdout in the binaries) and returns `false`; the process still exits
//! normally.

pub mod logging;
pub mod setup;
pub mod upload;
