//! Generic `(state, event) -> action` lookup table.
//!
//! The substrate every stage decision maker is built on. Pure and total:
//! an unmapped pair always yields the constructor-supplied default, so
//! `transition` can never fail.

use std::collections::HashMap;
use std::hash::Hash;

/// A finite transition table with a default action.
///
/// Populated by explicit builder functions at construction time; there is
/// no global registry and no hidden state beyond the table itself.
pub struct StateMachine<S, E, A> {
    transitions: HashMap<(S, E), A>,
    default_action: A,
}

impl<S, E, A> StateMachine<S, E, A>
where
    S: Eq + Hash,
    E: Eq + Hash,
    A: Clone,
{
    pub fn new(default_action: A) -> Self {
        Self {
            transitions: HashMap::new(),
            default_action,
        }
    }

    /// Register one transition. Last write wins on a duplicate key.
    pub fn add(&mut self, state: S, event: E, action: A) {
        self.transitions.insert((state, event), action);
    }

    /// Look up the action for `(state, event)`, falling back to the
    /// default when the pair was never registered.
    pub fn transition(&self, state: S, event: E) -> A {
        self.transitions
            .get(&(state, event))
            .cloned()
            .unwrap_or_else(|| self.default_action.clone())
    }

    /// Number of registered transitions (for diagnostics/tests).
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
