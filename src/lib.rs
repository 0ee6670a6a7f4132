//! pkgrank crate
//!
//! This crate is an implementation detail of the `pkgrank` tool. This crate's API is fluid and may change without warning
//! and in a semver-incompatible way.

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[doc(hidden)]
pub mod acquire;

#[doc(hidden)]
pub mod collected;

#[doc(hidden)]
pub mod commands;

#[doc(hidden)]
pub mod config;

#[doc(hidden)]
pub mod error;

#[doc(hidden)]
pub mod measure;

#[doc(hidden)]
pub mod scoring;

#[doc(hidden)]
pub mod store;
