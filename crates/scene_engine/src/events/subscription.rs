//! Subscription slots and the tokens that own them

use super::Event;
use crate::ecs::EntityHandle;
use std::any::TypeId;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

pub(crate) type Handler = Rc<dyn Fn(&dyn Event)>;

/// One (event type, handler) binding
///
/// Owned by its [`SubscriptionToken`]; the bus only holds a `Weak` to it.
pub(crate) struct Subscription {
    event_type: TypeId,
    active: Cell<bool>,
    owner: Option<EntityHandle>,
    handler: Handler,
}

impl Subscription {
    pub(crate) fn new(event_type: TypeId, owner: Option<EntityHandle>, handler: Handler) -> Self {
        Self {
            event_type,
            active: Cell::new(true),
            owner,
            handler,
        }
    }

    pub(crate) fn is_deliverable(&self) -> bool {
        self.active.get() && self.owner.as_ref().map_or(true, EntityHandle::alive)
    }

    /// Shared reference to the handler, kept alive across a re-entrant call
    pub(crate) fn handler(&self) -> Handler {
        Rc::clone(&self.handler)
    }

    pub(crate) fn deactivate(&self) {
        self.active.set(false);
    }
}

/// Owned handle for one active subscription
///
/// Dropping the token (or calling [`unsubscribe`](Self::unsubscribe)) ends
/// delivery immediately, including for a publish that is already running.
#[must_use = "dropping the token cancels the subscription"]
pub struct SubscriptionToken {
    slot: Option<Rc<Subscription>>,
}

impl SubscriptionToken {
    pub(crate) fn new(slot: Rc<Subscription>) -> Self {
        Self { slot: Some(slot) }
    }

    /// Whether the handler would still receive events
    pub fn is_active(&self) -> bool {
        self.slot.as_ref().is_some_and(|slot| slot.is_deliverable())
    }

    /// Type tag of the subscribed event, `None` once unsubscribed
    pub fn event_type(&self) -> Option<TypeId> {
        self.slot.as_ref().map(|slot| slot.event_type)
    }

    /// Cancel the subscription; calling it again is a no-op
    pub fn unsubscribe(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.deactivate();
        }
    }
}

impl Drop for SubscriptionToken {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionToken")
            .field("active", &self.is_active())
            .finish()
    }
}
