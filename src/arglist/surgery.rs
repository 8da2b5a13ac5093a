//! Structural surgery on argument lists
//!
//! These operations change the representation of a list without changing
//! the constraints it describes (except [`ArgList::backtrack_in_initial`],
//! which resolves a contradiction by ending the list earlier).

use super::types::{ArgList, ArgListError, ListResult, Presence};
use tracing::trace;

/// Greatest common divisor
pub(crate) fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl ArgList {
    /// Replicate the loop segment `m` times in place (`m >= 1`).
    pub fn unfold_loop(&mut self, m: usize) -> ListResult<()> {
        debug_assert!(!self.repeated.is_empty());
        if m <= 1 {
            return Ok(());
        }
        let period = self.repeated.count();
        self.repeated.reserve(period * (m - 1))?;
        for _ in 1..m {
            for j in 0..period {
                let copy = self.repeated.elements[j].clone();
                self.repeated.elements.push(copy);
            }
        }
        self.repeated.length *= m;
        Ok(())
    }

    /// Grow the initial segment to exactly `m` arguments by absorbing loop
    /// iterations, rotating the loop so its phase is preserved.
    ///
    /// Requires `m >= initial.length()` and a non-empty loop.
    pub fn rotate_loop(&mut self, m: usize) -> ListResult<()> {
        debug_assert!(m >= self.initial.length);
        debug_assert!(!self.repeated.is_empty());
        if m == self.initial.length {
            return Ok(());
        }

        if self.repeated.count() == 1 {
            // One copy with a higher repcount instead of many copies.
            let extra = m - self.initial.length;
            let e = self.repeated.elements[0].with_repcount(extra);
            self.initial.reserve(1)?;
            self.initial.push(e);
            return Ok(());
        }

        // m = initial.length + q * n + r, 0 <= r < n
        let n = self.repeated.length;
        let q = (m - self.initial.length) / n;
        let r = (m - self.initial.length) % n;
        let (s, t) = self.repeated.locate(r);
        debug_assert!(s < self.repeated.count());

        // q full copies, the first s elements, and a split-off of element s.
        let count = self.repeated.count();
        self.initial
            .reserve(q * count + s + usize::from(t > 0))?;
        for _ in 0..q {
            for j in 0..count {
                self.initial.push(self.repeated.elements[j].clone());
            }
        }
        for j in 0..s {
            self.initial.push(self.repeated.elements[j].clone());
        }
        if t > 0 {
            self.initial.push(self.repeated.elements[s].with_repcount(t));
        }
        debug_assert_eq!(self.initial.length, m);

        if r > 0 {
            let rep = &mut self.repeated.elements;
            rep.rotate_left(s);
            if t > 0 {
                rep.try_reserve(1)?;
                let tail = rep[0].with_repcount(t);
                rep[0].repcount -= t;
                rep.push(tail);
            }
        }
        Ok(())
    }

    /// Ensure an element boundary at position `n` of the initial segment,
    /// rotating the loop first if needed. Returns the index of the element
    /// starting at `n` (or the element count if `n` is the end).
    pub fn split_at_boundary(&mut self, n: usize) -> ListResult<usize> {
        self.verify();

        if n > self.initial.length {
            if self.repeated.is_empty() {
                // Nothing lives beyond a finite list; the end is a boundary.
                return Ok(self.initial.count());
            }
            self.rotate_loop(n)?;
        }

        let (s, t) = self.initial.locate(n);
        if t == 0 {
            return Ok(s);
        }

        debug_assert!(s < self.initial.count());
        let old = self.initial.elements[s].repcount;
        let rest = self.initial.elements[s].with_repcount(old - t);
        self.initial.reserve(1)?;
        self.initial.elements[s].repcount = t;
        self.initial.elements.insert(s + 1, rest);

        self.verify();
        Ok(s + 1)
    }

    /// Make position `n` a singleton element of the initial segment and
    /// return its index.
    pub fn isolate(&mut self, n: usize) -> ListResult<usize> {
        let s = self.split_at_boundary(n)?;
        self.split_at_boundary(n + 1)?;
        debug_assert_eq!(self.initial.elements[s].repcount, 1);
        Ok(s)
    }

    /// Move the loop segment to the end of the initial segment, leaving a
    /// finite list.
    pub fn append_repeated_to_initial(&mut self) -> ListResult<()> {
        if self.repeated.is_empty() {
            return Ok(());
        }
        self.initial.reserve(self.repeated.count())?;
        let repeated = std::mem::take(&mut self.repeated);
        for e in repeated.elements {
            self.initial.push(e);
        }
        Ok(())
    }

    /// Resolve a contradiction in a finite list by ending it at the last
    /// position where it may end.
    ///
    /// Trailing required elements are dropped; the last optional element
    /// loses one argument. If no optional element exists the whole list is
    /// impossible.
    pub fn backtrack_in_initial(mut self) -> ListResult {
        debug_assert!(self.repeated.is_empty());

        while let Some(last) = self.initial.elements.last_mut() {
            if last.presence == Presence::Required {
                self.initial.pop();
                continue;
            }
            // The list must end here.
            if last.repcount > 1 {
                last.repcount -= 1;
                self.initial.length -= 1;
            } else {
                self.initial.pop();
            }
            trace!(length = self.initial.length, "backtracked to optional end");
            self.verify();
            return Ok(self);
        }

        trace!("backtracking found no optional end");
        Err(ArgListError::Contradiction)
    }
}
