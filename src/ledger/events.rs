//! Typed change-notification channels.
//!
//! One channel per collection kind (entities, transactions, receipts).
//! Observers are invoked synchronously, in registration order, from within
//! the mutating call; an observer must not re-enter a mutator on the same
//! aggregate.

use std::fmt;

/// Handle returned by [`ObserverChannel::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

type Callback = Box<dyn Fn()>;

/// Registration-ordered list of callbacks for one event kind.
#[derive(Default)]
pub struct ObserverChannel {
    observers: Vec<(ObserverToken, Callback)>,
    next_token: u64,
}

impl ObserverChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl Fn() + 'static) -> ObserverToken {
        let token = ObserverToken(self.next_token);
        self.next_token += 1;
        self.observers.push((token, Box::new(callback)));
        token
    }

    /// Removes the observer registered under `token`; returns whether it was
    /// still present.
    pub fn unsubscribe(&mut self, token: ObserverToken) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(t, _)| *t != token);
        self.observers.len() != before
    }

    pub fn notify(&self) {
        for (_, callback) in &self.observers {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for ObserverChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverChannel")
            .field("observers", &self.observers.len())
            .finish()
    }
}
