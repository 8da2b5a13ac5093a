//! Canonical form of argument constraint lists
//!
//! Two lists describe the same constraints iff their normalized forms are
//! structurally identical. Normalization merges equal neighbours, reduces the
//! loop to its minimal period and rolls as much of the initial segment's tail
//! into the loop as possible.

use super::types::{nested, ArgElement, ArgList, Segment};

impl ArgList {
    /// Normalize nested lists first, then this list.
    ///
    /// Sublists can only be attached through [`ArgElement::elementwise`],
    /// which refuses to nest beyond [`super::MAX_NESTING_DEPTH`].
    pub fn normalize(&mut self) {
        self.verify();

        for e in self
            .initial
            .elements
            .iter_mut()
            .chain(self.repeated.elements.iter_mut())
        {
            if let Some(sub) = e.sublist.as_mut() {
                nested(|| sub.normalize());
            }
        }
        self.normalize_outermost();

        self.verify();
    }

    /// Consuming variant of [`ArgList::normalize`]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Normalize this list assuming all sublists are already normalized.
    pub(crate) fn normalize_outermost(&mut self) {
        merge_adjacent(&mut self.initial);
        merge_adjacent(&mut self.repeated);

        if self.repeated.is_empty() {
            return;
        }

        self.reduce_period();
        self.roll_initial_into_loop();
    }

    fn reduce_period(&mut self) {
        let rep = &mut self.repeated;
        let mut n = rep.count();

        // If the loop wraps around onto an equal element, proceed as if the
        // period were n-1 with the first repcount incremented.
        let mut repcount0_extra = 0;
        if n > 1 && rep.elements[0].same_constraint(&rep.elements[n - 1]) {
            repcount0_extra = rep.elements[n - 1].repcount;
            n -= 1;
        }

        for m in 2..=n / 2 {
            if n % m != 0 {
                continue;
            }
            let ok = (0..n - m).all(|i| {
                let a = &rep.elements[i];
                let b = &rep.elements[i + m];
                a.repcount + if i == 0 { repcount0_extra } else { 0 } == b.repcount
                    && a.same_constraint(b)
            });
            if ok {
                let wrapped = if n < rep.count() { rep.elements.pop() } else { None };
                rep.elements.truncate(m);
                rep.elements.extend(wrapped);
                rep.length /= n / m;
                break;
            }
        }

        if rep.count() == 1 {
            rep.elements[0].repcount = 1;
            rep.length = 1;
        }
    }

    fn roll_initial_into_loop(&mut self) {
        let ArgList { initial, repeated } = self;

        if repeated.count() == 1 {
            // The second-to-last initial element is certainly different after
            // merging, so at most one element rolls over.
            if initial
                .elements
                .last()
                .is_some_and(|last| last.same_constraint(&repeated.elements[0]))
            {
                initial.pop();
            }
            return;
        }

        while let (Some(init_last), Some(rep_last)) =
            (initial.elements.last(), repeated.elements.last())
        {
            if !init_last.same_constraint(rep_last) {
                break;
            }
            let moved = init_last.repcount.min(rep_last.repcount);
            let front = if repeated.elements[0].same_constraint(rep_last) {
                None
            } else {
                Some(rep_last.with_repcount(moved))
            };

            // Prepend to the loop.
            match front {
                Some(front) => repeated.elements.insert(0, front),
                None => repeated.elements[0].repcount += moved,
            }

            // Remove from the end of the loop.
            let last = repeated.elements.len() - 1;
            repeated.elements[last].repcount -= moved;
            if repeated.elements[last].repcount == 0 {
                repeated.elements.pop();
            }

            // Remove from the end of the initial segment.
            let last = initial.elements.len() - 1;
            initial.elements[last].repcount -= moved;
            if initial.elements[last].repcount == 0 {
                initial.elements.pop();
            }
            initial.length -= moved;
        }
    }
}

/// Combine adjacent elements with the same constraint.
fn merge_adjacent(seg: &mut Segment) {
    let mut merged: Vec<ArgElement> = Vec::with_capacity(seg.elements.len());
    for e in seg.elements.drain(..) {
        match merged.last_mut() {
            Some(prev) if prev.same_constraint(&e) => prev.repcount += e.repcount,
            _ => merged.push(e),
        }
    }
    seg.elements = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arglist::{ArgType, Presence};

    fn req(n: usize, ty: ArgType) -> ArgElement {
        ArgElement::new(n, Presence::Required, ty)
    }

    fn opt(n: usize, ty: ArgType) -> ArgElement {
        ArgElement::new(n, Presence::OptionalEnd, ty)
    }

    #[test]
    fn test_merge_adjacent() {
        let list = ArgList::from_segments(
            vec![req(1, ArgType::ANY), req(2, ArgType::ANY), req(1, ArgType::CHAR)],
            vec![],
        )
        .normalized();
        assert_eq!(list.initial().count(), 2);
        assert_eq!(list.initial().elements()[0].repcount, 3);
        assert_eq!(list.initial().length(), 4);
    }

    #[test]
    fn test_period_one_loop_has_repcount_one() {
        let list = ArgList::from_segments(vec![], vec![opt(3, ArgType::ANY)]).normalized();
        assert_eq!(list.repeated().count(), 1);
        assert_eq!(list.repeated().length(), 1);
        assert_eq!(list.repeated().elements()[0].repcount, 1);
    }

    #[test]
    fn test_reduce_period() {
        let a = opt(1, ArgType::INTEGER);
        let b = opt(1, ArgType::CHAR);
        let list = ArgList::from_segments(vec![], vec![a.clone(), b.clone(), a.clone(), b.clone()])
            .normalized();
        assert_eq!(list.repeated().count(), 2);
        assert_eq!(list.repeated().length(), 2);
    }

    #[test]
    fn test_reduce_period_with_wrap() {
        // a b a a b a : period 3 (a b a) with the wrap merging a|a
        let a = opt(1, ArgType::INTEGER);
        let b = opt(1, ArgType::CHAR);
        let list = ArgList::from_segments(
            vec![],
            vec![a.clone(), b.clone(), a.with_repcount(2), b.clone(), a.clone()],
        )
        .normalized();
        assert_eq!(list.repeated().length(), 3);
        assert_eq!(list.repeated().count(), 3);
    }

    #[test]
    fn test_roll_initial_into_period_one_loop() {
        let list = ArgList::from_segments(
            vec![req(1, ArgType::INTEGER), opt(4, ArgType::ANY)],
            vec![opt(1, ArgType::ANY)],
        )
        .normalized();
        assert_eq!(list.initial().length(), 1);
        assert_eq!(list.to_string(), "(i | . *)");
    }

    #[test]
    fn test_roll_initial_into_longer_loop() {
        let i = opt(1, ArgType::INTEGER);
        let c = opt(1, ArgType::CHAR);

        // c, i, c, i, ... is a pure loop starting with c
        let list = ArgList::from_segments(vec![c.clone()], vec![i.clone(), c.clone()]).normalized();
        assert_eq!(list.initial().length(), 0);
        assert_eq!(list.to_string(), "( | . c . i)");

        // i, i, c, i, c, ... keeps its leading i
        let list = ArgList::from_segments(vec![i.clone()], vec![i.clone(), c.clone()]).normalized();
        assert_eq!(list.initial().length(), 1);
    }

    #[test]
    fn test_normalize_recurses_into_sublists() {
        let sub =
            ArgList::from_segments(vec![req(1, ArgType::ANY), req(1, ArgType::ANY)], vec![]);
        let e =
            ArgElement::elementwise(1, Presence::Required, ArgType::ELEMENTWISE_2, sub).unwrap();
        let list = ArgList::from_segments(vec![e], vec![]).normalized();
        let sub = list.initial().elements()[0].sublist.as_ref().unwrap();
        assert_eq!(sub.initial().count(), 1);
        assert_eq!(list.to_string(), "(2(* *))");
    }
}
