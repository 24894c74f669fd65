//! Event system following Game Engine Architecture Ch 16.8
//!
//! Key principles:
//! - Typed events: the concrete Rust type of the event is its key
//! - Registration system (only notify interested handlers, in subscription order)
//! - Queuing support (immediate `publish` + deferred `post`/`flush`)
//! - Subscriptions are weak: the bus never keeps a handler alive, the
//!   [`SubscriptionToken`] returned to the subscriber does
//!
//! Delivery works on a snapshot of the subscriber list taken when the
//! publish starts. Handlers may subscribe, unsubscribe, destroy entities or
//! publish further events; none of that disturbs the delivery in progress.
//! Dead slots are compacted once the outermost publish has finished.
//!
//! Handlers are `Fn` and may be re-entered: a handler that publishes an
//! event it is itself subscribed to receives that nested event before its
//! outer call returns. Handler state lives in `Cell`/`RefCell` captures.

mod subscription;

pub use subscription::SubscriptionToken;

use crate::ecs::EntityHandle;
use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use subscription::{Handler, Subscription};

/// An immutable value delivered to subscribers
///
/// Implementors only need to expose themselves as [`Any`] so handlers can
/// be typed:
///
/// ```
/// use scene_engine::events::Event;
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct Explosion { radius: f32 }
///
/// impl Event for Explosion {
///     fn as_any(&self) -> &dyn Any { self }
/// }
/// ```
pub trait Event: Any + fmt::Debug {
    /// Borrow the event as [`Any`] for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Type tag of the concrete event behind a trait object
pub(crate) fn event_type(event: &dyn Event) -> TypeId {
    Any::type_id(event.as_any())
}

/// Publish/subscribe channel with lifetime-scoped subscriptions
pub struct EventBus {
    subscribers: RefCell<HashMap<TypeId, Vec<Weak<Subscription>>>>,
    queue: RefCell<VecDeque<Rc<dyn Event>>>,
    dispatch_depth: Cell<u32>,
}

impl EventBus {
    /// Create a new empty event bus
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(HashMap::new()),
            queue: RefCell::new(VecDeque::new()),
            dispatch_depth: Cell::new(0),
        }
    }

    /// Register a handler for events of type `E`
    ///
    /// Delivery stops as soon as the returned token is dropped or
    /// unsubscribed.
    pub fn subscribe<E: Event>(&self, handler: impl Fn(&E) + 'static) -> SubscriptionToken {
        self.subscribe_bound(None, handler)
    }

    /// Register a handler whose delivery also ends when `owner` dies
    pub fn subscribe_bound<E: Event>(
        &self,
        owner: Option<EntityHandle>,
        handler: impl Fn(&E) + 'static,
    ) -> SubscriptionToken {
        let erased: Handler = Rc::new(move |event: &dyn Event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                handler(event);
            }
        });
        self.insert(TypeId::of::<E>(), owner, erased)
    }

    /// Register an untyped handler for the event type `event_type`
    ///
    /// Used for string-keyed subscriptions where the type tag comes from the
    /// component registry.
    pub fn subscribe_dyn(
        &self,
        event_type: TypeId,
        owner: Option<EntityHandle>,
        handler: impl Fn(&dyn Event) + 'static,
    ) -> SubscriptionToken {
        self.insert(event_type, owner, Rc::new(handler))
    }

    fn insert(&self, event_type: TypeId, owner: Option<EntityHandle>, handler: Handler) -> SubscriptionToken {
        let slot = Rc::new(Subscription::new(event_type, owner, handler));
        if self.dispatch_depth.get() == 0 {
            self.compact();
        }
        self.subscribers
            .borrow_mut()
            .entry(event_type)
            .or_default()
            .push(Rc::downgrade(&slot));
        SubscriptionToken::new(slot)
    }

    /// Deliver `event` synchronously, returning how many handlers ran
    pub fn publish<E: Event>(&self, event: E) -> usize {
        self.publish_shared(Rc::new(event))
    }

    /// Deliver an already shared event synchronously
    pub fn publish_shared(&self, event: Rc<dyn Event>) -> usize {
        self.deliver(event.as_ref())
    }

    fn deliver(&self, event: &dyn Event) -> usize {
        let key = event_type(event);
        let targets = match self.subscribers.borrow().get(&key) {
            Some(slots) => slots.clone(),
            None => return 0,
        };

        self.dispatch_depth.set(self.dispatch_depth.get() + 1);
        let mut delivered = 0;
        for slot in targets {
            let Some(subscription) = slot.upgrade() else {
                continue;
            };
            if !subscription.is_deliverable() {
                continue;
            }
            let handler = subscription.handler();
            handler(event);
            delivered += 1;
        }
        self.dispatch_depth.set(self.dispatch_depth.get() - 1);

        if self.dispatch_depth.get() == 0 {
            self.compact();
        }
        log::trace!("Delivered {:?} to {} handler(s)", event, delivered);
        delivered
    }

    /// Queue an event for delivery on the next [`flush`](Self::flush)
    pub fn post<E: Event>(&self, event: E) {
        self.post_shared(Rc::new(event));
    }

    /// Queue an already shared event
    pub fn post_shared(&self, event: Rc<dyn Event>) {
        self.queue.borrow_mut().push_back(event);
    }

    /// Number of queued events waiting for a flush
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Deliver every event queued before this call, returning how many
    /// events were flushed
    ///
    /// Events posted by handlers during the flush stay queued for the next
    /// flush.
    pub fn flush(&self) -> usize {
        let batch: Vec<Rc<dyn Event>> = self.queue.borrow_mut().drain(..).collect();
        for event in &batch {
            self.deliver(event.as_ref());
        }
        batch.len()
    }

    /// Number of subscriptions for `E` that would currently receive an event
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.subscribers
            .borrow()
            .get(&TypeId::of::<E>())
            .map_or(0, |slots| {
                slots
                    .iter()
                    .filter_map(Weak::upgrade)
                    .filter(|subscription| subscription.is_deliverable())
                    .count()
            })
    }

    /// Drop all subscriptions and queued events
    ///
    /// Outstanding tokens report `is_active() == false` afterwards.
    pub fn clear(&self) {
        let slots = std::mem::take(&mut *self.subscribers.borrow_mut());
        for subscription in slots.values().flatten().filter_map(Weak::upgrade) {
            subscription.deactivate();
        }
        self.queue.borrow_mut().clear();
    }

    fn compact(&self) {
        self.subscribers.borrow_mut().retain(|_, slots| {
            slots.retain(|slot| slot.upgrade().is_some_and(|s| s.is_deliverable()));
            !slots.is_empty()
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.subscribers.borrow().len())
            .field("queued", &self.pending())
            .finish()
    }
}
