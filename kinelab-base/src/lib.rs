//! This library is an internal component of [`kinelab`],
//! which defines time and formatting helpers shared by the simulation library and its
//! command-line runner.
//! Do not depend on this library; use only [`kinelab`] instead.
//!
//! [`kinelab`]: ../kinelab/index.html

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![warn(clippy::missing_inline_in_public_items)]

/// Do not use this module directly; its contents are re-exported from `kinelab`.
pub mod time;

/// Do not use this module directly; its contents are re-exported from `kinelab`.
pub mod util;
