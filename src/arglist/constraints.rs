//! Adding constraints to argument lists
//!
//! These are the mutators a directive parser drives. Each consumes the list
//! and returns the constrained list, or [`ArgListError::Contradiction`] when
//! no argument list satisfies the accumulated constraints.

use super::setops::intersect_type;
use super::types::{ArgElement, ArgList, ArgListError, ArgType, ListResult, Presence};
use tracing::trace;

impl ArgList {
    /// True if arguments `0..=n` are all required.
    pub fn is_required(&self, n: usize) -> bool {
        // Check whether the first n+1 presence flags are Required.
        let mut t = n + 1;

        for seg in [&self.initial, &self.repeated] {
            let mut s = 0;
            while s < seg.count() && t >= seg.elements[s].repcount {
                if seg.elements[s].presence != Presence::Required {
                    return false;
                }
                t -= seg.elements[s].repcount;
                s += 1;
            }
            if t == 0 {
                return true;
            }
            if s < seg.count() {
                return seg.elements[s].presence == Presence::Required;
            }
        }

        // The loop, if any, consists only of required elements; however many
        // passes it takes, the answer stays the same.
        !self.repeated.is_empty()
    }

    /// Require arguments `0..=n` to be present.
    pub fn add_required_constraint(mut self, n: usize) -> ListResult {
        self.verify();

        if self.repeated.is_empty() && self.initial.length <= n {
            // Already limited to at most n arguments.
            return Err(ArgListError::Contradiction);
        }

        self.split_at_boundary(n + 1)?;

        let mut rest = n + 1;
        for e in self.initial.elements.iter_mut() {
            if rest == 0 {
                break;
            }
            e.presence = Presence::Required;
            rest -= e.repcount;
        }

        self.verify();
        Ok(self)
    }

    /// Forbid arguments at positions `>= n`.
    ///
    /// If position `n` was required, the list is backtracked to its last
    /// optional end, or found impossible.
    pub fn add_end_constraint(mut self, n: usize) -> ListResult {
        self.verify();

        if self.repeated.is_empty() && self.initial.length <= n {
            return Ok(self);
        }

        let s = self.split_at_boundary(n)?;
        let n_presence = match self.initial.elements.get(s) {
            Some(e) => e.presence,
            None => self.repeated.elements[0].presence,
        };

        while self.initial.count() > s {
            self.initial.pop();
        }
        self.repeated.clear();

        if n_presence == Presence::Required {
            trace!(position = n, "end constraint on a required argument");
            self.backtrack_in_initial()
        } else {
            Ok(self)
        }
    }

    /// Restrict arguments `n1..=n2` to `ty` (with `sublist` for elementwise
    /// types).
    ///
    /// Assumes a preceding `add_required_constraint(n2)`. A position whose
    /// type becomes empty ends the list there.
    pub fn add_type_constraint(
        mut self,
        n1: usize,
        n2: usize,
        ty: ArgType,
        sublist: Option<&ArgList>,
    ) -> ListResult {
        debug_assert!(n1 <= n2);
        let constraint = type_constraint(ty, sublist)?;

        let mut s = self.split_at_boundary(n1)?;
        self.split_at_boundary(n2 + 1)?;

        let mut n = n1;
        while n <= n2 {
            match intersect_type(&self.initial.elements[s], &constraint)? {
                Some((ty, sub)) => {
                    let e = &mut self.initial.elements[s];
                    e.ty = ty;
                    e.sublist = sub;
                    n += e.repcount;
                    s += 1;
                }
                None => return self.add_end_constraint(n),
            }
        }

        self.verify();
        Ok(self)
    }

    /// Restrict every argument at position `>= n`, if present, to `ty`.
    pub fn add_repeated_opt_type_constraint(
        mut self,
        n: usize,
        ty: ArgType,
        sublist: Option<&ArgList>,
    ) -> ListResult {
        let constraint = type_constraint(ty, sublist)?;
        let mut n = n;

        let s = self.split_at_boundary(n)?;

        for i in s..self.initial.count() {
            match intersect_type(&self.initial.elements[i], &constraint)? {
                Some((ty, sub)) => {
                    let e = &mut self.initial.elements[i];
                    e.ty = ty;
                    e.sublist = sub;
                    n += e.repcount;
                }
                None => return self.add_end_constraint(n),
            }
        }

        for i in 0..self.repeated.count() {
            match intersect_type(&self.repeated.elements[i], &constraint)? {
                Some((ty, sub)) => {
                    let e = &mut self.repeated.elements[i];
                    e.ty = ty;
                    e.sublist = sub;
                    n += e.repcount;
                }
                None => return self.add_end_constraint(n),
            }
        }

        self.verify();
        Ok(self)
    }
}

fn type_constraint(ty: ArgType, sublist: Option<&ArgList>) -> ListResult<ArgElement> {
    match sublist {
        Some(sub) => ArgElement::elementwise(1, Presence::OptionalEnd, ty, sub.clone()),
        None => Ok(ArgElement::new(1, Presence::OptionalEnd, ty)),
    }
}
