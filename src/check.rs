//! Equivalence check between a source string and its translation
//!
//! The strict comparison requires both strings to constrain their argument
//! lists identically. The lax comparison only requires the translation's
//! constraints to be a subset of the source's; it is used when the
//! [`EqualityPolicy`] lets the caller decide and the caller asks for it.

use crate::arglist::{equal_list, intersect, ArgList, ArgListError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Whose word counts for the strict/lax choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EqualityPolicy {
    /// Always compare strictly, whatever the caller asks for.
    #[default]
    ForceEquality,
    /// Compare strictly only if the caller asks for equality.
    CallerDecides,
}

impl EqualityPolicy {
    /// Effective equality flag for a caller's request
    pub fn resolve(self, requested: bool) -> bool {
        match self {
            EqualityPolicy::ForceEquality => true,
            EqualityPolicy::CallerDecides => requested,
        }
    }
}

/// Problem reported by a check
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckDiagnostic {
    #[error("format specifications in '{msgid}' and '{msgstr}' are not equivalent")]
    NotEquivalent { msgid: String, msgstr: String },

    #[error("format specifications in '{msgstr}' are not a subset of those in '{msgid}'")]
    NotSubset { msgid: String, msgstr: String },
}

/// Compare the constraints of a source string (`list1`) and its translation
/// (`list2`). Both must be normalized.
///
/// Returns true if there was an error; each error is passed to `logger`.
pub fn check_lists(
    list1: &ArgList,
    list2: &ArgList,
    equality: bool,
    policy: EqualityPolicy,
    logger: Option<&mut dyn FnMut(&CheckDiagnostic)>,
    pretty_msgid: &str,
    pretty_msgstr: &str,
) -> bool {
    let diagnostic = if policy.resolve(equality) {
        (!equal_list(list1, list2)).then(|| CheckDiagnostic::NotEquivalent {
            msgid: pretty_msgid.to_string(),
            msgstr: pretty_msgstr.to_string(),
        })
    } else {
        (!is_subset(list1, list2)).then(|| CheckDiagnostic::NotSubset {
            msgid: pretty_msgid.to_string(),
            msgstr: pretty_msgstr.to_string(),
        })
    };

    match diagnostic {
        Some(diagnostic) => {
            debug!(%diagnostic, "format check failed");
            if let Some(logger) = logger {
                logger(&diagnostic);
            }
            true
        }
        None => false,
    }
}

/// True if every argument list accepted by `list2` is accepted by `list1`
fn is_subset(list1: &ArgList, list2: &ArgList) -> bool {
    match intersect(list1.clone(), list2.clone()) {
        Ok(common) => equal_list(&common.normalized(), list2),
        Err(ArgListError::Contradiction) => false,
        Err(e) => {
            debug!(error = %e, "cannot compute intersection");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arglist::{ArgElement, ArgType, Presence};

    fn list(elements: Vec<ArgElement>) -> ArgList {
        ArgList::from_segments(elements, vec![]).normalized()
    }

    fn req(ty: ArgType) -> ArgElement {
        ArgElement::new(1, Presence::Required, ty)
    }

    #[test]
    fn test_policy_resolution() {
        assert!(EqualityPolicy::ForceEquality.resolve(false));
        assert!(!EqualityPolicy::CallerDecides.resolve(false));
        assert!(EqualityPolicy::CallerDecides.resolve(true));
    }

    #[test]
    fn test_equal_lists_pass() {
        let a = list(vec![req(ArgType::INTEGER)]);
        let policy = EqualityPolicy::ForceEquality;
        assert!(!check_lists(&a, &a.clone(), true, policy, None, "%d", "%d"));
    }

    #[test]
    fn test_mismatch_is_logged() {
        let a = list(vec![req(ArgType::INTEGER)]);
        let b = list(vec![req(ArgType::ANY)]);
        let mut seen = Vec::new();
        let mut logger = |d: &CheckDiagnostic| seen.push(d.to_string());
        let failed = check_lists(
            &a,
            &b,
            false,
            EqualityPolicy::ForceEquality,
            Some(&mut logger),
            "%d",
            "%s",
        );
        assert!(failed);
        assert_eq!(
            seen,
            vec!["format specifications in '%d' and '%s' are not equivalent".to_string()]
        );
    }

    #[test]
    fn test_lax_subset() {
        let wide = list(vec![req(ArgType::ANY)]);
        let narrow = list(vec![req(ArgType::INTEGER)]);
        let policy = EqualityPolicy::CallerDecides;
        assert!(!check_lists(&wide, &narrow, false, policy, None, "%s", "%d"));

        let mut seen = Vec::new();
        let mut logger = |d: &CheckDiagnostic| seen.push(d.clone());
        assert!(check_lists(
            &narrow,
            &wide,
            false,
            EqualityPolicy::CallerDecides,
            Some(&mut logger),
            "%d",
            "%s",
        ));
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].to_string(),
            "format specifications in '%s' are not a subset of those in '%d'"
        );
    }
}
