//! # rigbook
//!
//! Command line front end for the rigbook-core catalog engine.
//!
//! - `cli` - clap command tree and per-command output
//! - `config` - TOML configuration file
//! - `json` - JSON conversion of attributes, query specs and results

pub mod cli;
pub mod config;
pub mod json;
