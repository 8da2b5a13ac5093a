//! Argument constraint data model
//!
//! An [`ArgList`] describes the (possibly infinite) sequence of constraints a
//! format string imposes on its argument list. It is split into an initial
//! segment and a loop segment that repeats forever; a finite list has an
//! empty loop.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

/// Maximum depth of an elementwise sublist, and of compound specifier nesting.
pub const MAX_NESTING_DEPTH: usize = 1000;

/// Stack that must remain before descending into a sublist.
const STACK_RED_ZONE: usize = 64 * 1024;
/// Size of each stack segment allocated for deep sublists.
const STACK_SEGMENT: usize = 1024 * 1024;

/// Run a walk over a sublist, moving to a fresh stack segment when the
/// current one is nearly exhausted.
pub(crate) fn nested<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, f)
}

bitflags! {
    /// Set of value kinds an argument may have.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ArgType: u16 {
        const BOOL = 1 << 0;
        const INTEGER = 1 << 1;
        const FLOAT = 1 << 2;
        const CHAR = 1 << 3;
        /// String or array.
        const ARRAY = 1 << 4;
        const ASSOCIATIVE = 1 << 5;
        /// irange or simd.
        const IRANGE = 1 << 6;
        /// struct, class or union.
        const STRUCT = 1 << 7;
        /// Pointer or null.
        const POINTER = 1 << 8;

        /// Any value kind.
        const ANY = Self::BOOL.bits()
            | Self::INTEGER.bits()
            | Self::FLOAT.bits()
            | Self::CHAR.bits()
            | Self::ARRAY.bits()
            | Self::ASSOCIATIVE.bits()
            | Self::IRANGE.bits()
            | Self::STRUCT.bits()
            | Self::POINTER.bits();

        /// Flag: the argument is formatted element by element through a
        /// nested argument list.
        const ELEMENTWISE = 1 << 10;

        /// Compound specifier consuming one argument per element.
        const ELEMENTWISE_1 = Self::ELEMENTWISE.bits() | Self::ARRAY.bits() | Self::IRANGE.bits();

        /// Compound specifier consuming two arguments (key, value) per element.
        const ELEMENTWISE_2 = Self::ELEMENTWISE.bits() | Self::ASSOCIATIVE.bits();
    }
}

impl ArgType {
    /// True if the elementwise flag is set
    pub fn is_elementwise(self) -> bool {
        self.contains(ArgType::ELEMENTWISE)
    }
}

/// Whether the argument list may end right before an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Presence {
    /// The list cannot end before this argument.
    Required,
    /// The list may end before this argument.
    OptionalEnd,
}

impl Presence {
    /// Combined presence of two constraints on the same position
    pub fn intersect(self, other: Presence) -> Presence {
        if self == Presence::Required || other == Presence::Required {
            Presence::Required
        } else {
            Presence::OptionalEnd
        }
    }
}

/// Errors from list algebra operations
#[derive(Error, Debug)]
pub enum ArgListError {
    /// The accumulated constraints admit no argument list at all.
    #[error("argument constraints are contradictory")]
    Contradiction,

    /// Growing a segment failed.
    #[error("cannot grow argument constraint list: {0}")]
    Alloc(#[from] TryReserveError),

    /// An elementwise sublist would exceed the nesting limit.
    #[error("argument constraint lists nested more than {limit} levels deep")]
    TooDeep { limit: usize },
}

/// Result of an ownership-transferring list operation
pub type ListResult<T = ArgList> = std::result::Result<T, ArgListError>;

/// Constraint on a run of consecutive arguments
#[derive(Debug, Serialize)]
pub struct ArgElement {
    /// Number of consecutive arguments this constraint applies to (>= 1).
    pub(crate) repcount: usize,
    /// Can the argument list end right before this argument?
    pub(crate) presence: Presence,
    /// Possible value kinds.
    pub(crate) ty: ArgType,
    /// Present iff `ty` carries [`ArgType::ELEMENTWISE`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) sublist: Option<Box<ArgList>>,
}

impl ArgElement {
    /// A plain (non-elementwise) constraint. The elementwise flag is
    /// dropped from `ty`; nested lists go through [`ArgElement::elementwise`].
    pub fn new(repcount: usize, presence: Presence, ty: ArgType) -> Self {
        ArgElement {
            repcount,
            presence,
            ty: ty.difference(ArgType::ELEMENTWISE),
            sublist: None,
        }
    }

    /// An elementwise constraint owning its nested list
    pub fn elementwise(
        repcount: usize,
        presence: Presence,
        ty: ArgType,
        sublist: ArgList,
    ) -> ListResult<Self> {
        if sublist.depth() > MAX_NESTING_DEPTH {
            return Err(ArgListError::TooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }
        Ok(ArgElement {
            repcount,
            presence,
            ty: ty | ArgType::ELEMENTWISE,
            sublist: Some(Box::new(sublist)),
        })
    }

    /// Number of consecutive arguments covered
    pub fn repcount(&self) -> usize {
        self.repcount
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    pub fn ty(&self) -> ArgType {
        self.ty
    }

    /// Nested list of an elementwise constraint
    pub fn sublist(&self) -> Option<&ArgList> {
        self.sublist.as_deref()
    }

    /// Same presence, type and nested list; repcount is ignored.
    pub fn same_constraint(&self, other: &ArgElement) -> bool {
        self.presence == other.presence
            && self.ty == other.ty
            && match (&self.sublist, &other.sublist) {
                (Some(a), Some(b)) => nested(|| a.is_equivalent(b)),
                (None, None) => true,
                _ => false,
            }
    }

    /// Copy of this element with a different repcount
    pub(crate) fn with_repcount(&self, repcount: usize) -> Self {
        let mut e = self.clone();
        e.repcount = repcount;
        e
    }

    fn verify(&self) {
        debug_assert!(self.repcount > 0, "element with zero repcount");
        debug_assert_eq!(self.ty.is_elementwise(), self.sublist.is_some());
        if let Some(sub) = &self.sublist {
            nested(|| sub.verify());
        }
    }
}

impl Clone for ArgElement {
    fn clone(&self) -> Self {
        ArgElement {
            repcount: self.repcount,
            presence: self.presence,
            ty: self.ty,
            sublist: self.sublist.as_ref().map(|sub| nested(|| sub.clone())),
        }
    }
}

impl PartialEq for ArgElement {
    fn eq(&self, other: &Self) -> bool {
        self.repcount == other.repcount
            && self.presence == other.presence
            && self.ty == other.ty
            && match (&self.sublist, &other.sublist) {
                (Some(a), Some(b)) => nested(|| a == b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Eq for ArgElement {}

impl Drop for ArgElement {
    fn drop(&mut self) {
        if let Some(sub) = self.sublist.take() {
            nested(move || drop(sub));
        }
    }
}

/// Ordered run of elements with a cached total length
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub(crate) elements: Vec<ArgElement>,
    /// Sum of all repcounts.
    pub(crate) length: usize,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a segment, computing its length. Elements covering no
    /// argument are dropped.
    pub fn from_elements(mut elements: Vec<ArgElement>) -> Self {
        elements.retain(|e| e.repcount > 0);
        let length = elements.iter().map(|e| e.repcount).sum();
        Segment { elements, length }
    }

    /// Number of elements (not arguments)
    pub fn count(&self) -> usize {
        self.elements.len()
    }

    /// Number of arguments covered
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[ArgElement] {
        &self.elements
    }

    pub(crate) fn reserve(&mut self, additional: usize) -> ListResult<()> {
        self.elements.try_reserve(additional)?;
        Ok(())
    }

    pub(crate) fn push(&mut self, element: ArgElement) {
        self.length += element.repcount;
        self.elements.push(element);
    }

    pub(crate) fn pop(&mut self) -> Option<ArgElement> {
        let e = self.elements.pop()?;
        self.length -= e.repcount;
        Some(e)
    }

    pub(crate) fn clear(&mut self) {
        self.elements = Vec::new();
        self.length = 0;
    }

    /// Position `n` lies `t` arguments into element `s`. When `n` is at or
    /// past the end, `s == count()` and `t` is the overshoot.
    pub(crate) fn locate(&self, n: usize) -> (usize, usize) {
        let mut t = n;
        let mut s = 0;
        while s < self.elements.len() && t >= self.elements[s].repcount {
            t -= self.elements[s].repcount;
            s += 1;
        }
        (s, t)
    }

    fn verify(&self) {
        let mut total = 0;
        for e in &self.elements {
            e.verify();
            total += e.repcount;
        }
        debug_assert_eq!(total, self.length, "segment length out of sync");
    }
}

/// Periodic argument constraint list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgList {
    pub(crate) initial: Segment,
    pub(crate) repeated: Segment,
}

impl ArgList {
    /// Infinite list of optional arguments of any type
    pub fn unconstrained() -> Self {
        ArgList {
            initial: Segment::new(),
            repeated: Segment::from_elements(vec![ArgElement::new(
                1,
                Presence::OptionalEnd,
                ArgType::ANY,
            )]),
        }
    }

    /// Finite list of length 0
    pub fn empty() -> Self {
        ArgList {
            initial: Segment::new(),
            repeated: Segment::new(),
        }
    }

    /// Assemble a list from raw segments (not normalized). Elements with a
    /// zero repcount are dropped.
    pub fn from_segments(initial: Vec<ArgElement>, repeated: Vec<ArgElement>) -> Self {
        let list = ArgList {
            initial: Segment::from_elements(initial),
            repeated: Segment::from_elements(repeated),
        };
        list.verify();
        list
    }

    pub fn initial(&self) -> &Segment {
        &self.initial
    }

    pub fn repeated(&self) -> &Segment {
        &self.repeated
    }

    pub fn is_empty(&self) -> bool {
        self.initial.is_empty() && self.repeated.is_empty()
    }

    /// True if the list has no loop segment
    pub fn is_finite(&self) -> bool {
        self.repeated.is_empty()
    }

    /// Presence of position 0, if the list has any position at all
    pub fn first_presence(&self) -> Option<Presence> {
        self.initial
            .elements
            .first()
            .or_else(|| self.repeated.elements.first())
            .map(|e| e.presence)
    }

    /// Nesting depth: 1 for a list without elementwise elements
    pub fn depth(&self) -> usize {
        1 + self
            .initial
            .elements
            .iter()
            .chain(self.repeated.elements.iter())
            .filter_map(|e| e.sublist.as_ref())
            .map(|sub| nested(|| sub.depth()))
            .max()
            .unwrap_or(0)
    }

    /// Structural equality of two normalized lists
    pub fn is_equivalent(&self, other: &ArgList) -> bool {
        fn same_segment(a: &Segment, b: &Segment) -> bool {
            a.elements.len() == b.elements.len()
                && a
                    .elements
                    .iter()
                    .zip(b.elements.iter())
                    .all(|(e1, e2)| e1.repcount == e2.repcount && e1.same_constraint(e2))
        }
        same_segment(&self.initial, &other.initial) && same_segment(&self.repeated, &other.repeated)
    }

    /// Check the structural invariants (debug builds only)
    pub fn verify(&self) {
        self.initial.verify();
        self.repeated.verify();
    }
}

impl fmt::Display for ArgElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.presence == Presence::OptionalEnd {
            write!(f, ". ")?;
        }
        if let Some(sub) = &self.sublist {
            let arity = if self.ty == ArgType::ELEMENTWISE_2 { '2' } else { '1' };
            write!(f, "{}", arity)?;
            return nested(|| write!(f, "{}", sub));
        }
        if self.ty == ArgType::ANY {
            return write!(f, "*");
        }
        const LETTERS: [(ArgType, char); 9] = [
            (ArgType::BOOL, 'b'),
            (ArgType::INTEGER, 'i'),
            (ArgType::FLOAT, 'f'),
            (ArgType::CHAR, 'c'),
            (ArgType::ARRAY, 'a'),
            (ArgType::ASSOCIATIVE, '@'),
            (ArgType::IRANGE, 'r'),
            (ArgType::STRUCT, 's'),
            (ArgType::POINTER, 'p'),
        ];
        for (flag, letter) in LETTERS {
            if self.ty.contains(flag) {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ArgList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut first = true;
        for e in &self.initial.elements {
            for _ in 0..e.repcount {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                write!(f, "{}", e)?;
            }
        }
        if !self.repeated.is_empty() {
            write!(f, " |")?;
            for e in &self.repeated.elements {
                for _ in 0..e.repcount {
                    write!(f, " {}", e)?;
                }
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconstrained_and_empty() {
        let u = ArgList::unconstrained();
        assert!(!u.is_finite());
        assert_eq!(u.repeated().length(), 1);
        assert_eq!(u.first_presence(), Some(Presence::OptionalEnd));
        assert_eq!(u.to_string(), "( | . *)");

        let e = ArgList::empty();
        assert!(e.is_empty());
        assert_eq!(e.first_presence(), None);
        assert_eq!(e.to_string(), "()");
    }

    #[test]
    fn test_segment_length_tracks_repcounts() {
        let seg = Segment::from_elements(vec![
            ArgElement::new(2, Presence::Required, ArgType::INTEGER),
            ArgElement::new(3, Presence::OptionalEnd, ArgType::ANY),
        ]);
        assert_eq!(seg.count(), 2);
        assert_eq!(seg.length(), 5);
        assert_eq!(seg.locate(0), (0, 0));
        assert_eq!(seg.locate(1), (0, 1));
        assert_eq!(seg.locate(2), (1, 0));
        assert_eq!(seg.locate(5), (2, 0));
    }

    #[test]
    fn test_display_letters() {
        let list = ArgList::from_segments(
            vec![
                ArgElement::new(
                    1,
                    Presence::Required,
                    ArgType::BOOL | ArgType::INTEGER | ArgType::CHAR,
                ),
                ArgElement::new(2, Presence::Required, ArgType::ANY),
            ],
            vec![ArgElement::new(1, Presence::OptionalEnd, ArgType::POINTER)],
        );
        assert_eq!(list.to_string(), "(bic * * | . p)");
    }

    #[test]
    fn test_elementwise_depth_guard() {
        let mut list = ArgList::from_segments(
            vec![ArgElement::new(1, Presence::Required, ArgType::ANY)],
            vec![],
        );
        for _ in 1..MAX_NESTING_DEPTH {
            let e = ArgElement::elementwise(1, Presence::Required, ArgType::ELEMENTWISE_1, list)
                .unwrap();
            list = ArgList::from_segments(vec![e], vec![]);
        }
        assert_eq!(list.depth(), MAX_NESTING_DEPTH);
        let e =
            ArgElement::elementwise(1, Presence::Required, ArgType::ELEMENTWISE_1, list).unwrap();
        let list = ArgList::from_segments(vec![e], vec![]);
        let err = ArgElement::elementwise(1, Presence::Required, ArgType::ELEMENTWISE_1, list);
        assert!(matches!(err, Err(ArgListError::TooDeep { .. })));
    }

    #[test]
    fn test_deep_list_walks_on_default_stack() {
        let mut list = ArgList::from_segments(
            vec![ArgElement::new(1, Presence::Required, ArgType::CHAR)],
            vec![],
        );
        for _ in 1..MAX_NESTING_DEPTH {
            let e = ArgElement::elementwise(1, Presence::Required, ArgType::ELEMENTWISE_1, list)
                .unwrap();
            list = ArgList::from_segments(vec![e], vec![]);
        }

        let copy = list.clone();
        assert_eq!(copy, list);
        assert!(copy.is_equivalent(&list));
        let rendered = list.to_string();
        assert!(rendered.ends_with(&format!("(c){}", ")".repeat(MAX_NESTING_DEPTH - 1))));
        let normalized = copy.normalized();
        assert_eq!(normalized.depth(), MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_zero_repcount_elements_are_dropped() {
        let list = ArgList::from_segments(
            vec![ArgElement::new(0, Presence::Required, ArgType::CHAR)],
            vec![
                ArgElement::new(0, Presence::OptionalEnd, ArgType::ANY),
                ArgElement::new(0, Presence::OptionalEnd, ArgType::CHAR),
            ],
        );
        assert!(list.is_empty());
        assert!(list.is_finite());
        assert_eq!(list.repeated().length(), 0);
    }

    #[test]
    fn test_plain_element_never_carries_elementwise_flag() {
        let e = ArgElement::new(1, Presence::Required, ArgType::ELEMENTWISE_1);
        assert_eq!(e.ty(), ArgType::ARRAY | ArgType::IRANGE);
        assert!(e.sublist().is_none());
    }
}
