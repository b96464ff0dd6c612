//! In-process publish/subscribe messenger
//!
//! Subscribers register handlers per message type under a [`SubscriberId`].
//! `publish` runs the matching handlers synchronously on the caller's thread,
//! in registration order, against a snapshot of the handler list. The lock is
//! not held while handlers run, so a handler may register, unregister or
//! publish again.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

mod messages;
pub use messages::{VisibilityMessage, VisibilitySignal};

/// Identity a group of handlers is registered (and unregistered) under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Allocate a process-wide unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

struct Registration {
    subscriber: SubscriberId,
    message_type: TypeId,
    handler: Handler,
    // Cleared on unregister so in-flight snapshots skip the handler
    live: Arc<AtomicBool>,
}

#[derive(Default)]
pub struct Messenger {
    registrations: Mutex<Vec<Registration>>,
}

impl Messenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for messages of type `M` owned by `subscriber`
    pub fn register<M, F>(&self, subscriber: SubscriberId, handler: F)
    where
        M: Any,
        F: Fn(&M) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(move |message: &dyn Any| {
            if let Some(message) = message.downcast_ref::<M>() {
                handler(message);
            }
        });

        self.lock().push(Registration {
            subscriber,
            message_type: TypeId::of::<M>(),
            handler,
            live: Arc::new(AtomicBool::new(true)),
        });
        trace!(
            subscriber = ?subscriber,
            message = std::any::type_name::<M>(),
            "Registered handler"
        );
    }

    /// Deliver `message` to every live handler for `M`.
    /// Returns the number of handlers invoked.
    pub fn publish<M: Any>(&self, message: &M) -> usize {
        let message_type = TypeId::of::<M>();
        let snapshot: Vec<(Handler, Arc<AtomicBool>)> = self
            .lock()
            .iter()
            .filter(|registration| registration.message_type == message_type)
            .map(|registration| (registration.handler.clone(), registration.live.clone()))
            .collect();

        let mut delivered = 0;
        for (handler, live) in snapshot {
            if !live.load(Ordering::Acquire) {
                continue;
            }
            handler(message);
            delivered += 1;
        }
        trace!(message = std::any::type_name::<M>(), delivered, "Published message");
        delivered
    }

    /// Drop every handler owned by `subscriber`. Unknown ids are a no-op.
    /// Returns the number of handlers removed.
    pub fn unregister(&self, subscriber: SubscriberId) -> usize {
        let mut registrations = self.lock();
        let before = registrations.len();
        registrations.retain(|registration| {
            if registration.subscriber == subscriber {
                registration.live.store(false, Ordering::Release);
                false
            } else {
                true
            }
        });
        let removed = before - registrations.len();
        if removed > 0 {
            trace!(subscriber = ?subscriber, removed, "Unregistered handlers");
        }
        removed
    }

    pub fn is_registered(&self, subscriber: SubscriberId) -> bool {
        self.lock()
            .iter()
            .any(|registration| registration.subscriber == subscriber)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Registration>> {
        // A panicking handler never runs under this lock, so the list is intact
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
