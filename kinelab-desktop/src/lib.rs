//! Headless command-line runner for [`kinelab`] simulations.
//!
//! This library is the implementation of the `kinelab` binary; it is split out so that
//! its pieces can be tested. It sets up logging, loads configuration, and runs a chosen
//! scenario, writing a plain text trace.

pub mod config_files;
pub mod logging;
pub mod scenario;
