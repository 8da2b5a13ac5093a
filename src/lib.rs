// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # argcheck: format string argument checking
//!
//! Checks that a format string and its translation use their arguments in
//! compatible ways.
//!
//! ## Core Concept
//!
//! Every format string constrains the argument list it is called with:
//! how many arguments there must be, how many there may be, and which kinds
//! of value each one may have. argcheck represents these constraints as a
//! periodic [`ArgList`] (a finite initial segment followed by a loop that
//! repeats forever) and compares the lists of a source string and its
//! translation.
//!
//! - **Parse** a string into a descriptor with [`FormatStringParser::parse`]
//! - **Check** two descriptors with [`FormatStringParser::check`]
//! - **Combine** constraints directly with the [`arglist`] algebra
//!
//! ## Quick Start
//!
//! ```rust
//! use argcheck::{DFormat, FormatStringParser};
//!
//! let parser = DFormat::default();
//! let msgid = parser.parse("%d files", false).into_result().unwrap();
//! let msgstr = parser.parse("%s Dateien", false).into_result().unwrap();
//!
//! assert_eq!(msgid.list().to_string(), "(bic)");
//!
//! let mut messages = Vec::new();
//! let mut logger = |d: &argcheck::CheckDiagnostic| messages.push(d.to_string());
//! let failed = parser.check(&msgid, &msgstr, true, Some(&mut logger), "%d files", "%s Dateien");
//! assert!(failed);
//! ```
//!
//! ## Supported Grammars
//!
//! | Grammar | Parser |
//! |---------|--------|
//! | D `std.format` | [`DFormat`] |

pub mod arglist;
pub mod check;
pub mod config;
pub mod error;
pub mod format;

// Re-exports for convenience
pub use arglist::{
    equal_list, intersect, intersection, intersection_with_empty_list, union_with_empty_list,
    ArgElement, ArgList, ArgListError, ArgType, ListResult, Presence, Segment, MAX_NESTING_DEPTH,
};
pub use check::{check_lists, CheckDiagnostic, EqualityPolicy};
pub use config::CheckerConfig;
pub use error::{Error, Result};
pub use format::d::parse_d_format;
pub use format::{
    DFormat, DFormatSpec, DirectiveMark, FormatError, FormatStringParser, InvalidReason, MarkKind,
    ParseOutcome,
};

/// Version of argcheck
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
