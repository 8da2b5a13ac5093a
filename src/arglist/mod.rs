//! Argument list constraints
//!
//! A format string constrains the arguments it may be called with: which
//! positions must be present, where the list may end, and which kinds of
//! value each position accepts. This module represents those constraints as
//! a periodic list and implements the algebra over them:
//!
//! - building constraints one directive at a time ([`ArgList::add_required_constraint`],
//!   [`ArgList::add_end_constraint`], [`ArgList::add_type_constraint`],
//!   [`ArgList::add_repeated_opt_type_constraint`])
//! - combining lists ([`intersect`], [`union_with_empty_list`])
//! - comparing lists after [`ArgList::normalize`] ([`equal_list`])
//!
//! Operations that may prove the constraints unsatisfiable consume their
//! operands and return [`ListResult`]; [`ArgListError::Contradiction`] stands
//! for "no argument list fits".

mod constraints;
mod normalize;
mod setops;
mod surgery;
mod types;

pub use setops::{
    equal_list, intersect, intersection, intersection_with_empty_list, union_with_empty_list,
};
pub use types::{
    ArgElement, ArgList, ArgListError, ArgType, ListResult, Presence, Segment, MAX_NESTING_DEPTH,
};
