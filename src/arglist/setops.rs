//! Intersection and union of argument lists

use super::surgery::gcd;
use super::types::{
    nested, ArgElement, ArgList, ArgListError, ArgType, ListResult, Presence, Segment,
};
use tracing::trace;

/// Type part of an element: the kind set plus the nested list for
/// elementwise types.
pub(crate) type TypePart = (ArgType, Option<Box<ArgList>>);

/// Intersect the type parts of two elements.
///
/// `Ok(None)` means the types have no common value. A contradiction inside
/// nested lists is reported the same way.
pub(crate) fn intersect_type(
    e1: &ArgElement,
    e2: &ArgElement,
) -> ListResult<Option<TypePart>> {
    if e1.ty == ArgType::ANY {
        return Ok(Some((e2.ty, e2.sublist.clone())));
    }
    if e2.ty == ArgType::ANY {
        return Ok(Some((e1.ty, e1.sublist.clone())));
    }

    if (e1.ty & e2.ty).is_elementwise() {
        let same_arity = (e1.ty == ArgType::ELEMENTWISE_1 && e2.ty == ArgType::ELEMENTWISE_1)
            || (e1.ty == ArgType::ELEMENTWISE_2 && e2.ty == ArgType::ELEMENTWISE_2);
        if !same_arity {
            return Ok(None);
        }
        let (Some(sub1), Some(sub2)) = (&e1.sublist, &e2.sublist) else {
            return Ok(None);
        };
        let sub = nested(|| intersect(sub1.as_ref().clone(), sub2.as_ref().clone()));
        return match sub {
            Ok(sub) => Ok(Some((e1.ty, Some(Box::new(sub))))),
            Err(ArgListError::Contradiction) => Ok(None),
            Err(e) => Err(e),
        };
    }

    let ty = e1.ty & e2.ty;
    if ty.is_empty() {
        return Ok(None);
    }
    // At most one side is elementwise here; keep its nested list.
    let nested = e1.sublist.as_ref().or(e2.sublist.as_ref());
    Ok(Some(match nested {
        Some(sub) => (ty | ArgType::ELEMENTWISE, Some(sub.clone())),
        None => (ty, None),
    }))
}

/// Walks the elements of a segment, handing out runs of arguments.
struct Walker<'a> {
    elements: &'a [ArgElement],
    index: usize,
    left: usize,
}

impl<'a> Walker<'a> {
    fn new(elements: &'a [ArgElement]) -> Self {
        Walker {
            elements,
            index: 0,
            left: elements.first().map_or(0, |e| e.repcount),
        }
    }

    fn current(&self) -> Option<&'a ArgElement> {
        self.elements.get(self.index)
    }

    fn advance(&mut self, count: usize) {
        self.left -= count;
        if self.left == 0 {
            self.index += 1;
            self.left = self.elements.get(self.index).map_or(0, |e| e.repcount);
        }
    }
}

/// Outcome of intersecting two segments pairwise.
enum Walk {
    /// Both segments were fully consumed.
    Exhausted,
    /// The intersection stops at an empty type with this presence.
    Stopped(Presence),
}

/// Intersect the aligned elements of `w1` and `w2` into `out`, stopping when
/// either runs out or a type becomes empty.
fn walk_pairwise(
    w1: &mut Walker<'_>,
    w2: &mut Walker<'_>,
    out: &mut Segment,
) -> ListResult<Walk> {
    while let (Some(e1), Some(e2)) = (w1.current(), w2.current()) {
        let count = w1.left.min(w2.left);
        let presence = e1.presence.intersect(e2.presence);
        match intersect_type(e1, e2)? {
            Some((ty, sublist)) => {
                out.reserve(1)?;
                out.push(ArgElement {
                    repcount: count,
                    presence,
                    ty,
                    sublist,
                });
            }
            None => return Ok(Walk::Stopped(presence)),
        }
        w1.advance(count);
        w2.advance(count);
    }
    Ok(Walk::Exhausted)
}

/// Finish a finite result whose last position has the given presence.
fn end_with(result: ArgList, presence: Presence) -> ListResult {
    match presence {
        Presence::Required => result.backtrack_in_initial(),
        Presence::OptionalEnd => Ok(result),
    }
}

/// Combined constraints of two lists.
///
/// Consumes both operands. Returns [`ArgListError::Contradiction`] if no
/// argument list satisfies both.
pub fn intersect(mut list1: ArgList, mut list2: ArgList) -> ListResult {
    list1.verify();
    list2.verify();

    if !list1.repeated.is_empty() && !list2.repeated.is_empty() {
        // Bring both loops to lcm(n1, n2).
        let n1 = list1.repeated.length;
        let n2 = list2.repeated.length;
        let g = gcd(n1, n2);
        list1.unfold_loop(n2 / g)?;
        list2.unfold_loop(n1 / g)?;
    }

    if !list1.repeated.is_empty() || !list2.repeated.is_empty() {
        let m = list1.initial.length.max(list2.initial.length);
        if !list1.repeated.is_empty() {
            list1.rotate_loop(m)?;
        }
        if !list2.repeated.is_empty() {
            list2.rotate_loop(m)?;
        }
    }

    let mut result = ArgList::empty();
    let result = match intersect_aligned(&list1, &list2, &mut result)? {
        Some(presence) => end_with(result, presence),
        None => Ok(result),
    };

    result.map(|mut list| {
        // Undo the loop unfolding and rotation done above.
        list.normalize_outermost();
        list.verify();
        list
    })
}

/// Core of [`intersect`] on period- and phase-aligned operands. Returns the
/// presence the finite result must end with, or `None` if `result` is
/// complete as is.
fn intersect_aligned(
    list1: &ArgList,
    list2: &ArgList,
    result: &mut ArgList,
) -> ListResult<Option<Presence>> {
    let mut w1 = Walker::new(&list1.initial.elements);
    let mut w2 = Walker::new(&list2.initial.elements);

    if let Walk::Stopped(presence) = walk_pairwise(&mut w1, &mut w2, &mut result.initial)? {
        trace!(?presence, "intersection ends in initial segment");
        return Ok(Some(presence));
    }

    match (list1.repeated.is_empty(), list2.repeated.is_empty()) {
        (true, true) => {
            // Two finite lists: the longer one must be able to end here.
            let rest = w1.current().or(w2.current());
            Ok(rest.map(|e| e.presence).filter(|p| *p == Presence::Required))
        }
        (true, false) => {
            let next = w2.current().unwrap_or(&list2.repeated.elements[0]);
            Ok(Some(next.presence).filter(|p| *p == Presence::Required))
        }
        (false, true) => {
            let next = w1.current().unwrap_or(&list1.repeated.elements[0]);
            Ok(Some(next.presence).filter(|p| *p == Presence::Required))
        }
        (false, false) => {
            debug_assert!(w1.current().is_none() && w2.current().is_none());
            let mut w1 = Walker::new(&list1.repeated.elements);
            let mut w2 = Walker::new(&list2.repeated.elements);
            match walk_pairwise(&mut w1, &mut w2, &mut result.repeated)? {
                Walk::Exhausted => Ok(None),
                Walk::Stopped(presence) => {
                    trace!(?presence, "intersection ends in loop segment");
                    result.append_repeated_to_initial()?;
                    Ok(Some(presence))
                }
            }
        }
    }
}

/// Intersection where either operand may already be a contradiction.
pub fn intersection(list1: ListResult, list2: ListResult) -> ListResult {
    intersect(list1?, list2?)
}

/// Intersection with the zero-length list.
pub fn intersection_with_empty_list(list: &ArgList) -> ListResult {
    match list.first_presence() {
        Some(Presence::Required) => Err(ArgListError::Contradiction),
        _ => Ok(ArgList::empty()),
    }
}

/// Union with the zero-length list: the list may additionally be empty.
pub fn union_with_empty_list(mut list: ArgList) -> ListResult {
    list.verify();

    if list.first_presence() == Some(Presence::Required) {
        let s = list.isolate(0)?;
        debug_assert_eq!(s, 0);
        list.initial.elements[0].presence = Presence::OptionalEnd;
        // Element 0 may now merge with element 1.
        list.normalize_outermost();
    }

    list.verify();
    Ok(list)
}

/// Structural equality of two normalized lists.
pub fn equal_list(list1: &ArgList, list2: &ArgList) -> bool {
    list1.verify();
    list2.verify();
    list1.is_equivalent(list2)
}
