//! D format strings (`std.format`)
//!
//! A format string consists of literal text, doubled percent signs and
//! directives. A directive is
//!
//! - `%`
//! - optionally a position: `m$`, `m:m2$` (arguments m..=m2) or `m:$`
//!   (argument m and all following)
//! - optionally flags among `+ - space 0 # =`
//! - optionally a width: digits, `*` or `*m$`
//! - optionally a precision: `.` then digits, `*` or `*m$`
//! - optionally a separator: `,` then digits or `*`, then optionally `?`
//! - a conversion specifier, or a compound specifier
//!   `%( body %| delimiter %)` whose body consumes 1 or 2 arguments per
//!   element of the formatted range
//!
//! Each `*` consumes an integer argument of its own; a separator `?`
//! consumes a char argument.

use super::{
    DirectiveMark, FormatError, FormatStringParser, InvalidReason, MarkKind, ParseOutcome,
};
use crate::arglist::{equal_list, ArgList, ArgListError, ArgType, ListResult};
use crate::check::{check_lists, CheckDiagnostic};
use crate::config::CheckerConfig;
use serde::Serialize;
use tracing::{debug, trace};

/// Parser for D format strings
#[derive(Debug, Clone, Default)]
pub struct DFormat {
    config: CheckerConfig,
}

/// Descriptor of a valid D format string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DFormatSpec {
    directives: usize,
    likely_intentional_directives: usize,
    list: ArgList,
}

impl DFormatSpec {
    /// Number of directives, `%%` included
    pub fn directives(&self) -> usize {
        self.directives
    }

    /// Number of directives without a space flag
    pub fn likely_intentional_directives(&self) -> usize {
        self.likely_intentional_directives
    }

    /// Normalized argument constraints
    pub fn list(&self) -> &ArgList {
        &self.list
    }

    /// Same constraints as `other`
    pub fn is_equivalent(&self, other: &DFormatSpec) -> bool {
        equal_list(&self.list, &other.list)
    }
}

impl DFormat {
    pub fn new(config: CheckerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }
}

/// Parse a D format string with the default configuration
pub fn parse_d_format(text: &str) -> Result<DFormatSpec, FormatError> {
    DFormat::default().parse(text, false).into_result()
}

impl FormatStringParser for DFormat {
    type Descriptor = DFormatSpec;

    fn parse(&self, text: &str, _translated: bool) -> ParseOutcome<DFormatSpec> {
        let mut parser = Parser {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            marks: Vec::new(),
            max_depth: self.config.max_nesting_depth,
        };
        let result = parser.parse_all().and_then(|frame| {
            let mut list = frame.list.ok_or(FormatError::new(
                InvalidReason::IncompatibleArgTypes,
                None,
            ))?;
            list.normalize();
            Ok(DFormatSpec {
                directives: frame.directives,
                likely_intentional_directives: frame.likely_intentional,
                list,
            })
        });

        match &result {
            Ok(spec) => trace!(text, list = %spec.list, "parsed format string"),
            Err(e) => debug!(text, reason = %e, offset = ?e.offset, "rejected format string"),
        }

        ParseOutcome {
            result,
            marks: parser.marks,
        }
    }

    fn directive_count(&self, descr: &DFormatSpec) -> usize {
        descr.directives
    }

    fn is_unlikely_intentional(&self, descr: &DFormatSpec) -> bool {
        descr.likely_intentional_directives == 0
    }

    fn check(
        &self,
        msgid: &DFormatSpec,
        msgstr: &DFormatSpec,
        equality: bool,
        logger: Option<&mut dyn FnMut(&CheckDiagnostic)>,
        pretty_msgid: &str,
        pretty_msgstr: &str,
    ) -> bool {
        // std.format rejects unused trailing arguments, so by default a
        // translation may not drop any argument.
        check_lists(
            &msgid.list,
            &msgstr.list,
            equality,
            self.config.equality_policy,
            logger,
            pretty_msgid,
            pretty_msgstr,
        )
    }
}

/// Per-string parse state; a compound body gets its own frame.
struct Frame {
    directives: usize,
    likely_intentional: usize,
    /// `None` once the constraints contradict each other.
    list: Option<ArgList>,
    /// Next implicit argument; `None` after an "all following" directive.
    cursor: Option<usize>,
    depth: usize,
}

impl Frame {
    fn new(depth: usize) -> Self {
        Self {
            directives: 0,
            likely_intentional: 0,
            list: Some(ArgList::unconstrained()),
            cursor: Some(0),
            depth,
        }
    }
}

/// Everything of a directive that precedes its conversion specifier.
struct Header {
    number: usize,
    first_number: usize,
    second_number: usize,
    second_is_last: bool,
    width_number: usize,
    width_from_arg: bool,
    precision_number: usize,
    precision_from_arg: bool,
    separator_digits_from_arg: bool,
    separator_char_from_arg: bool,
    likely_intentional: bool,
}

/// A compound specifier whose body is being read.
struct OpenCompound {
    /// Frame of the text around the compound.
    outer: Frame,
    header: Header,
    /// Offset of the `(`.
    open: usize,
}

/// Conversion specifier of a directive
enum Specifier {
    Value(ArgType),
    /// `%(`
    Open,
    /// `%|`
    Bar,
    /// `%)`
    Close,
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    marks: Vec<DirectiveMark>,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn byte_at(&self, at: usize) -> Option<u8> {
        self.bytes.get(at).copied()
    }

    fn peek(&self) -> Option<u8> {
        self.byte_at(self.pos)
    }

    fn mark(&mut self, offset: usize, kind: MarkKind) {
        self.marks.push(DirectiveMark::new(offset, kind));
    }

    fn fail(&mut self, reason: InvalidReason, offset: usize) -> FormatError {
        self.mark(offset, MarkKind::Error);
        FormatError::new(reason, Some(offset))
    }

    /// Decimal number starting at `at`, clamped to `u32::MAX`, and the
    /// offset after its last digit.
    fn number(&self, at: usize) -> (usize, usize) {
        let mut end = at;
        let mut value: u64 = 0;
        while let Some(b @ b'0'..=b'9') = self.byte_at(end) {
            value = value
                .saturating_mul(10)
                .saturating_add(u64::from(b - b'0'))
                .min(u64::from(u32::MAX));
            end += 1;
        }
        (value as usize, end)
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    /// `*` or `*m$` after the `*` has been consumed. Returns the explicit
    /// argument number, or 0 when the next implicit argument is meant.
    fn star_argument(&mut self, zero: InvalidReason) -> Result<usize, FormatError> {
        if !self.peek().is_some_and(|b| b.is_ascii_digit()) {
            return Ok(0);
        }
        let (m, end) = self.number(self.pos);
        if self.byte_at(end) != Some(b'$') {
            return Ok(0);
        }
        if m == 0 {
            return Err(self.fail(zero, end));
        }
        self.pos = end + 1;
        Ok(m)
    }

    /// Parse the whole text and return the top-level frame.
    ///
    /// Compound bodies are read in the same loop: opening one suspends the
    /// current frame on `open`, closing one resumes it. An error inside a
    /// body leaves an error mark just after each enclosing `(`.
    fn parse_all(&mut self) -> Result<Frame, FormatError> {
        let mut frame = Frame::new(0);
        let mut open: Vec<OpenCompound> = Vec::new();

        match self.parse_frames(&mut frame, &mut open) {
            Ok(()) => Ok(frame),
            Err(mut e) => {
                for compound in open.iter().rev() {
                    let at = if compound.open + 1 < self.bytes.len() {
                        compound.open + 1
                    } else {
                        compound.open
                    };
                    self.mark(at, MarkKind::Error);
                    e.offset = e.offset.or(Some(at));
                }
                Err(e)
            }
        }
    }

    fn parse_frames(
        &mut self,
        frame: &mut Frame,
        open: &mut Vec<OpenCompound>,
    ) -> Result<(), FormatError> {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            self.pos += 1;
            if c != b'%' {
                continue;
            }

            self.mark(self.pos - 1, MarkKind::Start);
            frame.directives += 1;

            match self.peek() {
                None => {
                    return Err(self.fail(InvalidReason::UnterminatedDirective, self.pos - 1));
                }
                Some(b'%') => {
                    self.end_directive(frame, true);
                    continue;
                }
                Some(_) => {}
            }

            let header = self.header(frame.directives)?;
            match self.specifier(header.number)? {
                Specifier::Value(ty) => {
                    self.apply(frame, &header, ty, None)?;
                    self.end_directive(frame, header.likely_intentional);
                }
                Specifier::Open => {
                    let at = self.pos;
                    if frame.depth >= self.max_depth {
                        return Err(self.fail(
                            InvalidReason::NestingTooDeep {
                                limit: self.max_depth,
                            },
                            at,
                        ));
                    }
                    self.pos += 1;
                    let body = Frame::new(frame.depth + 1);
                    let outer = std::mem::replace(frame, body);
                    open.push(OpenCompound {
                        outer,
                        header,
                        open: at,
                    });
                }
                Specifier::Bar | Specifier::Close if open.is_empty() => {
                    let reason = match self.peek() {
                        Some(b'|') => InvalidReason::BarOutsideCompound,
                        _ => InvalidReason::UnmatchedNesting {
                            found: ')',
                            expected: '(',
                        },
                    };
                    return Err(self.fail(reason, self.pos));
                }
                Specifier::Bar | Specifier::Close => {
                    if self.peek() == Some(b'|') {
                        self.delimiter(header.number)?;
                    }
                    self.finish(frame)?;
                    if let Some(compound) = open.pop() {
                        let body = std::mem::replace(frame, compound.outer);
                        let (ty, sublist) = self.compound_type(body, compound.header.number)?;
                        self.apply(frame, &compound.header, ty, Some(&sublist))?;
                        self.end_directive(frame, compound.header.likely_intentional);
                    }
                }
            }
        }

        if !open.is_empty() {
            return Err(FormatError::new(
                InvalidReason::UnmatchedNesting {
                    found: '(',
                    expected: ')',
                },
                None,
            ));
        }
        self.finish(frame)
    }

    /// Count a complete directive whose last byte is at `pos`.
    fn end_directive(&mut self, frame: &mut Frame, likely_intentional: bool) {
        if likely_intentional {
            frame.likely_intentional += 1;
        }
        self.mark(self.pos, MarkKind::End);
        self.pos += 1;
    }

    /// Close a frame: extra arguments at the end are not allowed.
    fn finish(&mut self, frame: &mut Frame) -> Result<(), FormatError> {
        if let Some(n) = frame.cursor {
            self.constrain(frame, |list| list.add_end_constraint(n))?;
        }
        if frame.list.is_none() {
            return Err(FormatError::new(InvalidReason::IncompatibleArgTypes, None));
        }
        Ok(())
    }

    /// Position, flags, width, precision and separator of a directive, with
    /// `pos` just after the `%`. On success `pos` is at the specifier.
    fn header(&mut self, number: usize) -> Result<Header, FormatError> {
        let mut header = Header {
            number,
            first_number: 0,
            second_number: 0,
            second_is_last: false,
            width_number: 0,
            width_from_arg: false,
            precision_number: 0,
            precision_from_arg: false,
            separator_digits_from_arg: false,
            separator_char_from_arg: false,
            likely_intentional: true,
        };

        // Position
        if self.peek().is_some_and(|b| b.is_ascii_digit()) {
            let (m, end) = self.number(self.pos);
            match self.byte_at(end) {
                Some(b'$') => {
                    if m == 0 {
                        return Err(
                            self.fail(InvalidReason::ArgNumberZero { directive: number }, end)
                        );
                    }
                    header.first_number = m;
                    self.pos = end + 1;
                }
                Some(b':') => {
                    let after = end + 1;
                    if self.byte_at(after).is_some_and(|b| b.is_ascii_digit()) {
                        let (m2, end2) = self.number(after);
                        if self.byte_at(end2) == Some(b'$') {
                            if m == 0 || m2 == 0 {
                                return Err(self.fail(
                                    InvalidReason::ArgNumberZero { directive: number },
                                    end2,
                                ));
                            }
                            if m > m2 {
                                return Err(self.fail(
                                    InvalidReason::ArgNumberOrder { directive: number },
                                    end2,
                                ));
                            }
                            header.first_number = m;
                            header.second_number = m2;
                            self.pos = end2 + 1;
                        }
                    } else if self.byte_at(after) == Some(b'$') {
                        if m == 0 {
                            return Err(self.fail(
                                InvalidReason::ArgNumberZero { directive: number },
                                after,
                            ));
                        }
                        header.first_number = m;
                        header.second_is_last = true;
                        self.pos = after + 1;
                    }
                }
                _ => {}
            }
        }

        // Flags
        while let Some(b @ (b' ' | b'+' | b'-' | b'#' | b'0' | b'=')) = self.peek() {
            if b == b' ' {
                header.likely_intentional = false;
            }
            self.pos += 1;
        }

        // Width
        if self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.skip_digits();
        } else if self.peek() == Some(b'*') {
            self.pos += 1;
            header.width_number =
                self.star_argument(InvalidReason::WidthArgNumberZero { directive: number })?;
            header.width_from_arg = header.width_number == 0;
        }

        // Precision
        if self.peek() == Some(b'.') {
            self.pos += 1;
            if self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.skip_digits();
            } else if self.peek() == Some(b'*') {
                self.pos += 1;
                header.precision_number = self
                    .star_argument(InvalidReason::PrecisionArgNumberZero { directive: number })?;
                header.precision_from_arg = header.precision_number == 0;
            }
        }

        // Separator
        if self.peek() == Some(b',') {
            self.pos += 1;
            if self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.skip_digits();
            } else if self.peek() == Some(b'*') {
                self.pos += 1;
                header.separator_digits_from_arg = true;
            }
            if self.peek() == Some(b'?') {
                self.pos += 1;
                header.separator_char_from_arg = true;
            }
        }

        Ok(header)
    }

    /// Classify the byte at `pos` without consuming it.
    fn specifier(&mut self, number: usize) -> Result<Specifier, FormatError> {
        let ty = match self.peek() {
            Some(b's') => ArgType::ANY,
            Some(b'c') => ArgType::CHAR,
            Some(b'd' | b'u' | b'b' | b'o') => ArgType::BOOL | ArgType::INTEGER | ArgType::CHAR,
            Some(b'x' | b'X') => {
                ArgType::BOOL | ArgType::INTEGER | ArgType::CHAR | ArgType::POINTER
            }
            Some(b'e' | b'E' | b'f' | b'F' | b'g' | b'G' | b'a' | b'A') => {
                ArgType::INTEGER | ArgType::FLOAT
            }
            Some(b'r') => {
                ArgType::BOOL
                    | ArgType::INTEGER
                    | ArgType::FLOAT
                    | ArgType::CHAR
                    | ArgType::ARRAY
                    | ArgType::IRANGE
            }
            Some(b'(') => return Ok(Specifier::Open),
            Some(b'|') => return Ok(Specifier::Bar),
            Some(b')') => return Ok(Specifier::Close),
            None => {
                return Err(self.fail(InvalidReason::UnterminatedDirective, self.pos - 1));
            }
            Some(_) => {
                let found = self.text[self.pos..].chars().next().unwrap_or('\u{FFFD}');
                return Err(self.fail(
                    InvalidReason::InvalidConversion {
                        directive: number,
                        found,
                    },
                    self.pos,
                ));
            }
        };
        Ok(Specifier::Value(ty))
    }

    /// Record the arguments a directive consumes. Width, precision and
    /// separator arguments come before the value.
    fn apply(
        &mut self,
        frame: &mut Frame,
        header: &Header,
        ty: ArgType,
        sublist: Option<&ArgList>,
    ) -> Result<(), FormatError> {
        let number = header.number;

        if header.width_number > 0 {
            let n = header.width_number - 1;
            self.require_type(frame, n, n, ArgType::INTEGER, None)?;
            bump(&mut frame.cursor, header.width_number);
        } else if header.width_from_arg {
            let n = self.next_argument(frame, number)?;
            self.require_type(frame, n, n, ArgType::INTEGER, None)?;
        }

        if header.precision_number > 0 {
            let n = header.precision_number - 1;
            self.require_type(frame, n, n, ArgType::INTEGER, None)?;
            bump(&mut frame.cursor, header.precision_number);
        } else if header.precision_from_arg {
            let n = self.next_argument(frame, number)?;
            self.require_type(frame, n, n, ArgType::INTEGER, None)?;
        }

        if header.separator_digits_from_arg {
            let n = self.next_argument(frame, number)?;
            self.require_type(frame, n, n, ArgType::INTEGER, None)?;
        }
        if header.separator_char_from_arg {
            let n = self.next_argument(frame, number)?;
            self.require_type(frame, n, n, ArgType::CHAR, None)?;
        }

        let first = header.first_number;
        if first > 0 {
            if header.second_number > 0 {
                self.require_type(frame, first - 1, header.second_number - 1, ty, sublist)?;
                bump(&mut frame.cursor, header.second_number);
            } else if header.second_is_last {
                self.require_type(frame, first - 1, first - 1, ty, sublist)?;
                self.constrain(frame, |list| {
                    list.add_repeated_opt_type_constraint(first, ty, sublist)
                })?;
                frame.cursor = None;
            } else {
                self.require_type(frame, first - 1, first - 1, ty, sublist)?;
                bump(&mut frame.cursor, first);
            }
        } else {
            let n = self.next_argument(frame, number)?;
            self.require_type(frame, n, n, ty, sublist)?;
        }

        Ok(())
    }

    /// Type of a finished compound body, with `pos` at the `)` of its `%)`.
    fn compound_type(
        &mut self,
        body: Frame,
        number: usize,
    ) -> Result<(ArgType, ArgList), FormatError> {
        let sublist = body
            .list
            .ok_or(FormatError::new(InvalidReason::IncompatibleArgTypes, None))?;
        if !sublist.is_finite() {
            return Err(self.fail(
                InvalidReason::CompoundVarargs { directive: number },
                self.pos - 1,
            ));
        }
        let ty = match sublist.initial().length() {
            1 => ArgType::ELEMENTWISE_1,
            2 => ArgType::ELEMENTWISE_2,
            count => {
                return Err(self.fail(
                    InvalidReason::CompoundArgCount {
                        directive: number,
                        count,
                    },
                    self.pos - 1,
                ));
            }
        };
        trace!(depth = body.depth, %sublist, "compound specifier");
        Ok((ty, sublist))
    }

    /// Literal delimiter after `%|`, with `pos` at the `|`. Stops at the `)`
    /// of the closing `%)`.
    fn delimiter(&mut self, number: usize) -> Result<(), FormatError> {
        self.pos += 1;
        loop {
            match self.peek() {
                None => {
                    return Err(self.fail(InvalidReason::UnterminatedCompound, self.pos - 1));
                }
                Some(b'%') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'%') => self.pos += 1,
                        Some(b')') => return Ok(()),
                        None => {
                            return Err(
                                self.fail(InvalidReason::UnterminatedCompound, self.pos - 1)
                            );
                        }
                        Some(_) => {
                            return Err(self.fail(
                                InvalidReason::CompoundDelimiter { directive: number },
                                self.pos,
                            ));
                        }
                    }
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Take the next implicit argument position.
    fn next_argument(&mut self, frame: &mut Frame, number: usize) -> Result<usize, FormatError> {
        match frame.cursor.as_mut() {
            Some(n) => {
                let current = *n;
                *n += 1;
                Ok(current)
            }
            None => Err(self.fail(InvalidReason::ArgPastLast { directive: number }, self.pos)),
        }
    }

    /// Require arguments `0..=n2` and restrict `n1..=n2` to `ty`.
    fn require_type(
        &mut self,
        frame: &mut Frame,
        n1: usize,
        n2: usize,
        ty: ArgType,
        sublist: Option<&ArgList>,
    ) -> Result<(), FormatError> {
        self.constrain(frame, |list| {
            list.add_required_constraint(n2)?
                .add_type_constraint(n1, n2, ty, sublist)
        })
    }

    /// Apply a list operation unless the constraints already contradict.
    ///
    /// A contradiction is remembered in the frame and reported once the
    /// string has been read completely; other list errors abort the parse.
    fn constrain<F>(&mut self, frame: &mut Frame, op: F) -> Result<(), FormatError>
    where
        F: FnOnce(ArgList) -> ListResult,
    {
        let Some(list) = frame.list.take() else {
            return Ok(());
        };
        match op(list) {
            Ok(list) => {
                frame.list = Some(list);
                Ok(())
            }
            Err(ArgListError::Contradiction) => {
                trace!(offset = self.pos, "argument constraints contradict");
                Ok(())
            }
            Err(ArgListError::Alloc(_)) => {
                Err(self.fail(InvalidReason::ResourceExhausted, self.pos.min(self.last())))
            }
            Err(ArgListError::TooDeep { limit }) => {
                Err(self.fail(InvalidReason::NestingTooDeep { limit }, self.pos.min(self.last())))
            }
        }
    }

    fn last(&self) -> usize {
        self.bytes.len().saturating_sub(1)
    }
}

/// Move an implicit cursor past an explicitly numbered argument.
fn bump(cursor: &mut Option<usize>, past: usize) {
    if let Some(n) = cursor {
        if *n < past {
            *n = past;
        }
    }
}
