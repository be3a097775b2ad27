//! Config document store
//!
//! Loads the document that maps masters and builders to configs, configs to
//! mixin lists, and mixins to GN argument fragments. Structural problems are
//! collected in one pass when the document is loaded; [`lint`] adds the
//! stricter checks behind `mb validate`.

mod document;
mod lint;

pub(crate) use document::format_problems;
pub use document::{ConfigDocument, ConfigError, ConfigRef, Mixin, ValidationError};
pub use lint::{lint, CODECS_MIXIN, PUBLIC_ARTIFACT_MASTER};
