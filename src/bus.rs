/*!
In-process update notifications.

A view that writes one of the locally persisted domain collections
publishes the matching [`UpdateEvent`]; every other mounted view that
subscribed re-reads its backing collection on delivery. Nothing is
persisted and nothing is replayed: a subscriber registered after an
event was published never sees that event.
*/
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

/// Which locally persisted collection changed. No payload; interested
/// views re-read the collection itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateEvent {
    Courses,
    Assignments,
    Quizzes,
    Grades,
    Discussions,
    Notifications,
}

impl std::fmt::Display for UpdateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let token = match self {
            UpdateEvent::Courses       => "courses",
            UpdateEvent::Assignments   => "assignments",
            UpdateEvent::Quizzes       => "quizzes",
            UpdateEvent::Grades        => "grades",
            UpdateEvent::Discussions   => "discussions",
            UpdateEvent::Notifications => "notifications",
        };

        write!(f, "{}", token)
    }
}

impl std::str::FromStr for UpdateEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "courses"       => Ok(UpdateEvent::Courses),
            "assignments"   => Ok(UpdateEvent::Assignments),
            "quizzes"       => Ok(UpdateEvent::Quizzes),
            "grades"        => Ok(UpdateEvent::Grades),
            "discussions"   => Ok(UpdateEvent::Discussions),
            "notifications" => Ok(UpdateEvent::Notifications),
            _ => Err(format!("{:?} is not a valid UpdateEvent.", s)),
        }
    }
}

type Handler = Arc<dyn Fn(UpdateEvent) + Send + Sync>;

struct Registry {
    next_id: u64,
    handlers: HashMap<u64, Handler>,
}

/// The in-process publish/subscribe channel. Cloning yields another
/// handle onto the same subscriber registry.
#[derive(Clone)]
pub struct UpdateBus {
    inner: Arc<Mutex<Registry>>,
}

impl UpdateBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                handlers: HashMap::new(),
            })),
        }
    }

    /// Register `handler` for every event published from now until the
    /// returned [`Subscription`] is cancelled.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(UpdateEvent) + Send + Sync + 'static,
    {
        let mut reg = self.inner.lock().unwrap();
        let id = reg.next_id;
        reg.next_id += 1;
        reg.handlers.insert(id, Arc::new(handler));
        log::trace!("UpdateBus::subscribe() registered subscriber {}.", id);

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every currently registered subscriber.
    ///
    /// The subscriber set is snapshotted before delivery, so a handler
    /// that subscribes or cancels mid-publish affects later publishes
    /// only. A panicking handler is logged and skipped; it neither
    /// stops delivery to the rest nor propagates to the publisher.
    pub fn publish(&self, event: UpdateEvent) {
        log::trace!("UpdateBus::publish( {} ) called.", &event);

        let handlers: Vec<(u64, Handler)> = {
            let reg = self.inner.lock().unwrap();
            reg.handlers.iter()
                .map(|(id, h)| (*id, Arc::clone(h)))
                .collect()
        };

        for (id, handler) in handlers.iter() {
            if catch_unwind(AssertUnwindSafe(|| (**handler)(event))).is_err() {
                log::error!(
                    "Subscriber {} panicked handling {} event; continuing delivery.",
                    id, &event
                );
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let reg = self.inner.lock().unwrap();
        reg.handlers.len()
    }
}

impl Default for UpdateBus {
    fn default() -> Self { Self::new() }
}

/// Capability to remove one subscriber. A mounted view holds this for
/// its lifetime and cancels on teardown; dropping it without cancelling
/// leaves the handler registered.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the subscriber. Idempotent; a no-op once the bus itself
    /// is gone.
    pub fn cancel(&self) {
        let inner = match self.registry.upgrade() {
            Some(inner) => inner,
            None => { return; },
        };

        let mut reg = inner.lock().unwrap();
        if reg.handlers.remove(&self.id).is_some() {
            log::trace!("Subscriber {} cancelled.", self.id);
        }
    }
}
