// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// How much of a view could actually be computed.
///
/// Failures are absorbed into empty or partial results. This marker keeps "empty because the data
/// could not be read" apart from "empty because there is nothing".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completeness {
    #[default]
    Complete,

    /// Some of the items could not be resolved, the view shows everything else.
    Partial { reasons: Vec<String> },

    /// Nothing could be read.
    Unavailable { reason: String },
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }

    pub(crate) fn from_issues(issues: Vec<String>) -> Self {
        if issues.is_empty() {
            Completeness::Complete
        } else {
            Completeness::Partial { reasons: issues }
        }
    }

    /// Completeness of a view derived from two inputs. `Unavailable` dominates, partial reasons
    /// are collected.
    pub fn merge(self, other: Completeness) -> Completeness {
        match (self, other) {
            (unavailable @ Completeness::Unavailable { .. }, _)
            | (_, unavailable @ Completeness::Unavailable { .. }) => unavailable,
            (Completeness::Complete, other) => other,
            (partial, Completeness::Complete) => partial,
            (
                Completeness::Partial { mut reasons },
                Completeness::Partial {
                    reasons: other_reasons,
                },
            ) => {
                reasons.extend(other_reasons);
                Completeness::Partial { reasons }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Completeness;

    #[test]
    fn merge() {
        let partial = |reason: &str| Completeness::Partial {
            reasons: vec![reason.to_string()],
        };
        let unavailable = Completeness::Unavailable {
            reason: "access denied".into(),
        };

        assert!(Completeness::Complete.merge(Completeness::Complete).is_complete());
        assert_eq!(Completeness::Complete.merge(partial("a")), partial("a"));
        assert_eq!(partial("a").merge(Completeness::Complete), partial("a"));
        assert_eq!(
            partial("a").merge(partial("b")),
            Completeness::Partial {
                reasons: vec!["a".into(), "b".into()]
            }
        );
        assert_eq!(partial("a").merge(unavailable.clone()), unavailable);
        assert_eq!(Completeness::from_issues(Vec::new()), Completeness::Complete);
    }
}
