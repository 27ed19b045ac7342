//! # gittree-core
//!
//! Core types for the gittree commit graph browser.
//!
//! gittree renders a repository's history as a lane-based network graph in
//! the terminal and lets the user act on the selected commit. This crate holds
//! the pieces every other crate agrees on:
//!
//! - Commit records as produced by a commit source
//! - Generation ids that tag one complete graph-construction run
//! - Filter parameters and the validated source configuration
//! - Mutation requests sent to the repository backend
//! - The unified error type and the configuration file

mod config;
mod error;
mod types;

pub use config::{is_valid_date_format, ColorConfig, GitConfig, GitTreeConfig, Style};
pub use error::{GitTreeError, MutationFailure, Result};
pub use types::*;
