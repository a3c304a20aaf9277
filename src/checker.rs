//! Duplicate and conflict detection over the complete member list.

use std::collections::{BTreeSet, HashMap};

use crate::emit::WrappedFunction;
use crate::error::{RejectionKind, Result};

/// A member dropped from the output.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub function: WrappedFunction,
    /// Signature identity of the rejected member.
    pub identity: String,
    /// Signature identity of the member that kept the name.
    pub accepted: String,
}

/// Accepted and rejected members, in discovery order.
#[derive(Debug, Default)]
pub struct CheckOutcome {
    pub accepted: Vec<WrappedFunction>,
    pub rejected: Vec<Rejection>,
    /// Interface members satisfied by an identical accepted member.
    pub implemented: BTreeSet<String>,
}

/// Partitions members by name uniqueness.
///
/// The first member to claim a name keeps it. A later member with the same
/// name is merged when an interface is involved and the signatures are
/// identical, and rejected otherwise.
#[derive(Debug, Default)]
pub struct DuplicateChecker {
    index: HashMap<String, Claim>,
}

#[derive(Debug)]
struct Claim {
    identity: String,
    interface: bool,
}

impl DuplicateChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the whole member list at once.
    pub fn check(mut self, members: Vec<WrappedFunction>) -> Result<CheckOutcome> {
        let mut outcome = CheckOutcome::default();

        for function in members {
            let identity = function.identity()?;
            let Some(claim) = self.index.get(&function.name) else {
                self.index.insert(
                    function.name.clone(),
                    Claim {
                        identity,
                        interface: function.interface,
                    },
                );
                outcome.accepted.push(function);
                continue;
            };

            if claim.interface || function.interface {
                if claim.identity == identity {
                    outcome.implemented.insert(function.name.clone());
                    continue;
                }
                outcome.rejected.push(Rejection {
                    kind: RejectionKind::Signature,
                    function,
                    identity,
                    accepted: claim.identity.clone(),
                });
            } else {
                outcome.rejected.push(Rejection {
                    kind: RejectionKind::Ambiguous,
                    function,
                    identity,
                    accepted: claim.identity.clone(),
                });
            }
        }

        Ok(outcome)
    }
}
