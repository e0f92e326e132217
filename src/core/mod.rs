//! Core types for ADFX
//!
//! The foundation every other module builds on:
//!
//! - [`error`] - [`AdfError`] for the few fatal conditions, plus
//!   [`ErrorContext`] / [`user_friendly_error`] for terminal display
//! - [`diagnostic`] - [`Warning`] and [`Diagnostics`] for recoverable findings
//! - [`resource`] - [`ResourceKind`], the closed set of resource kinds
//! - [`entity`] - [`EntityId`] and [`EdgeKind`], the vocabulary of the
//!   dependency graph
//!
//! # Error First Design
//!
//! Only a template that cannot be walked at all is an error. Everything else
//! (an expression that does not evaluate, two pipelines with one name, a
//! dataset nobody declared) is a [`Warning`] and the analysis carries on.

pub mod diagnostic;
pub mod entity;
pub mod error;
pub mod resource;

pub use diagnostic::{Diagnostics, Warning};
pub use entity::{EdgeKind, EntityId, EntityKind};
pub use error::{AdfError, ErrorContext, user_friendly_error};
pub use resource::ResourceKind;
