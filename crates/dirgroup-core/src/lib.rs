//! # dirgroup-core
//!
//! Core types shared by the directory group-membership crates.
//!
//! This crate carries no directory protocol code. It provides the error taxonomy, the
//! configuration describing how group membership is derived, and bind credentials.
//!
//! ## Modules
//!
//! - [`error`] - Error types and classification helpers
//! - [`config`] - Group resolution and mapping configuration
//! - [`credentials`] - Bind credentials for directory servers

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod credentials;
pub mod error;

pub use config::{EntryGroupSource, GroupMapping, GroupResolutionConfig, DEFAULT_MAX_DEPTH};
pub use credentials::BindCredentials;
pub use error::{Error, Result};
