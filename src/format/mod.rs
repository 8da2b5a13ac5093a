//! Format string parsers
//!
//! A parser turns one format string into an opaque descriptor holding the
//! constraints the string puts on its argument list, or rejects it with an
//! [`InvalidReason`]. Descriptors of a source string and of its translation
//! are then compared with [`FormatStringParser::check`].
//!
//! Currently supports:
//! - D (`std.format`), see [`d`]

pub mod d;

pub use d::{DFormat, DFormatSpec};

use crate::check::CheckDiagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a directive position marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    /// First byte of a directive (the `%`).
    Start,
    /// Last byte of a directive.
    End,
    /// Byte at which the string was found invalid.
    Error,
}

/// Position marker for highlighting directives in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveMark {
    /// Byte offset into the parsed string.
    pub offset: usize,
    pub kind: MarkKind,
}

impl DirectiveMark {
    pub fn new(offset: usize, kind: MarkKind) -> Self {
        Self { offset, kind }
    }
}

/// Result of parsing one string, with the markers collected on the way
///
/// Markers are produced for rejected strings too; the `Error` marker then
/// points at the offending byte.
#[derive(Debug, Clone)]
pub struct ParseOutcome<D> {
    pub result: Result<D, FormatError>,
    pub marks: Vec<DirectiveMark>,
}

impl<D> ParseOutcome<D> {
    /// Drop the markers
    pub fn into_result(self) -> Result<D, FormatError> {
        self.result
    }

    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }
}

/// Why a string is not a valid format string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    #[error("The string ends in the middle of a directive.")]
    UnterminatedDirective,

    #[error("In the directive number {directive}, the argument number 0 is not a positive integer.")]
    ArgNumberZero { directive: usize },

    #[error("In the directive number {directive}, the width's argument number 0 is not a positive integer.")]
    WidthArgNumberZero { directive: usize },

    #[error("In the directive number {directive}, the precision's argument number 0 is not a positive integer.")]
    PrecisionArgNumberZero { directive: usize },

    #[error("In the directive number {directive}, the first argument number is greater than the second argument number.")]
    ArgNumberOrder { directive: usize },

    #[error("{}", conversion_message(*directive, *found))]
    InvalidConversion { directive: usize, found: char },

    #[error("In the directive number {directive}, the compound specifier consumes a variable number of arguments.")]
    CompoundVarargs { directive: usize },

    #[error("In the directive number {directive}, the compound specifier consumes {count} arguments.")]
    CompoundArgCount { directive: usize, count: usize },

    #[error("Found '%|' outside of '%(...%)'.")]
    BarOutsideCompound,

    #[error("The string ends in the middle of a compound specifier.")]
    UnterminatedCompound,

    #[error("In the directive number {directive}, there is an invalid directive in the delimiter part of a compound specifier.")]
    CompoundDelimiter { directive: usize },

    #[error("Found '%{found}' without matching '%{expected}'.")]
    UnmatchedNesting { found: char, expected: char },

    #[error("The directive number {directive} references an argument after the last argument.")]
    ArgPastLast { directive: usize },

    #[error("The string refers to some argument in incompatible ways.")]
    IncompatibleArgTypes,

    #[error("Compound specifiers are nested more than {limit} levels deep.")]
    NestingTooDeep { limit: usize },

    #[error("Not enough memory to represent the argument constraints.")]
    ResourceExhausted,
}

/// Printable ASCII characters are quoted; anything else is described.
fn conversion_message(directive: usize, found: char) -> String {
    if found.is_ascii_graphic() || found == ' ' {
        format!(
            "In the directive number {}, the character '{}' is not a valid conversion specifier.",
            directive, found
        )
    } else {
        format!(
            "The character that terminates the directive number {} is not a valid conversion specifier.",
            directive
        )
    }
}

/// A rejected format string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct FormatError {
    pub reason: InvalidReason,
    /// Byte offset the error refers to, if it can be pinpointed.
    pub offset: Option<usize>,
}

impl FormatError {
    pub fn new(reason: InvalidReason, offset: Option<usize>) -> Self {
        Self { reason, offset }
    }
}

/// Directive grammar of one host language
pub trait FormatStringParser {
    /// Parsed representation of one valid string.
    type Descriptor;

    /// Parse `text`. `translated` tells whether the string comes from a
    /// translation rather than from the source code.
    fn parse(&self, text: &str, translated: bool) -> ParseOutcome<Self::Descriptor>;

    /// Number of directives in the string, including `%%`
    fn directive_count(&self, descr: &Self::Descriptor) -> usize;

    /// True if the string only looks like a format string by accident
    fn is_unlikely_intentional(&self, descr: &Self::Descriptor) -> bool;

    /// Compare a source string against its translation.
    ///
    /// Each problem found is passed to `logger`. Returns true if there was
    /// an error.
    fn check(
        &self,
        msgid: &Self::Descriptor,
        msgstr: &Self::Descriptor,
        equality: bool,
        logger: Option<&mut dyn FnMut(&CheckDiagnostic)>,
        pretty_msgid: &str,
        pretty_msgstr: &str,
    ) -> bool;
}
