//! Shared infrastructure for the rbz checker.
//!
//! This crate provides:
//! - `Span`/`Loc` - Source location tracking
//! - `FileTable` - File metadata and strictness levels
//! - `Diagnostic`/`ErrorQueue` - Error reporting

pub mod diagnostics;
pub mod files;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticCategory, ErrorBuilder, ErrorLine, ErrorQueue};
pub use files::{FileId, FileTable, StrictLevel};
pub use span::{Loc, Span};
