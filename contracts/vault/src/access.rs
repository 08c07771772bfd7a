//! # Authorization
//!
//! Privileged vault calls ask an injected [`Authorizer`] whether the caller may
//! perform an [`Action`]. The vault never owns role state itself.

use std::collections::{BTreeMap, BTreeSet};

use crate::Address;

/// Privileged operations gated by the authorizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Pause,
    Unpause,
}

/// "Is this caller allowed to do that" capability.
pub trait Authorizer {
    fn is_authorized(&self, caller: &Address, action: Action) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&Address, Action) -> bool,
{
    fn is_authorized(&self, caller: &Address, action: Action) -> bool {
        self(caller, action)
    }
}

/// Owner-plus-grants registry. The owner is authorized for every action.
#[derive(Clone, Debug)]
pub struct RoleRegistry {
    owner: Address,
    grants: BTreeMap<Address, BTreeSet<Action>>,
}

impl RoleRegistry {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            grants: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn grant(mut self, account: Address, action: Action) -> Self {
        self.grants.entry(account).or_default().insert(action);
        self
    }

    pub fn revoke(&mut self, account: &Address, action: Action) {
        if let Some(actions) = self.grants.get_mut(account) {
            actions.remove(&action);
            if actions.is_empty() {
                self.grants.remove(account);
            }
        }
    }
}

impl Authorizer for RoleRegistry {
    fn is_authorized(&self, caller: &Address, action: Action) -> bool {
        if *caller == self.owner {
            return true;
        }
        self.grants
            .get(caller)
            .is_some_and(|actions| actions.contains(&action))
    }
}
