//! The notification queue service.
//!
//! # Invariants
//!
//! - `items.len() <= capacity` after every operation. Overflow evicts from
//!   the front (oldest first), regardless of severity.
//! - Each live notice owns at most one timer handle. Every removal path
//!   (dismiss, eviction, expiry, clear) takes the handle out with the notice
//!   and cancels it.
//! - Timer callbacks remove by id, never by index, so a late fire for a
//!   notice that is already gone changes nothing.
//! - Subscribers only ever see cloned snapshots taken after an operation has
//!   completed.
//!
//! The queue is single-threaded (`Rc`-based, `!Send`). A listener may call
//! back into the queue; the nested change is delivered once the current
//! delivery round has reached every listener.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use lumina_common::ToastSettings;

use crate::scheduler::{DeadlineScheduler, Scheduler, TimerHandle};
use crate::toast::{Severity, Toast, ToastId, ToastOptions};

type Listener = Box<dyn Fn(&[Toast])>;

struct ListenerSlot {
    id: u64,
    active: Cell<bool>,
    callback: Listener,
}

struct LiveToast {
    toast: Toast,
    timer: Option<TimerHandle>,
}

#[derive(Default)]
struct QueueState {
    items: Vec<LiveToast>,
    next_id: u64,
}

struct QueueInner {
    state: RefCell<QueueState>,
    listeners: RefCell<Vec<Rc<ListenerSlot>>>,
    next_listener: Cell<u64>,
    scheduler: Rc<dyn Scheduler>,
    settings: ToastSettings,
    delivering: Cell<bool>,
    outbox: RefCell<VecDeque<Vec<Toast>>>,
}

/// Why a notice left the queue. Used for logging only; subscribers see the
/// same snapshot update for every reason.
#[derive(Debug, Clone, Copy)]
enum Removal {
    Dismissed,
    Evicted,
    Expired,
    Cleared,
}

/// Handle to a shared notification queue. Clones refer to the same queue.
#[derive(Clone)]
pub struct ToastQueue {
    inner: Rc<QueueInner>,
}

thread_local! {
    static GLOBAL: RefCell<Option<ToastQueue>> = const { RefCell::new(None) };
}

impl ToastQueue {
    /// Queue with default settings (capacity 3, 5000 ms default duration).
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_settings(scheduler, ToastSettings::default())
    }

    pub fn with_settings(scheduler: Rc<dyn Scheduler>, mut settings: ToastSettings) -> Self {
        settings.capacity = settings.capacity.max(1);
        Self {
            inner: Rc::new(QueueInner {
                state: RefCell::new(QueueState::default()),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
                scheduler,
                settings,
                delivering: Cell::new(false),
                outbox: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// The thread's shared queue.
    ///
    /// Created on first use with default settings and the thread's
    /// [`DeadlineScheduler`], unless one was installed with
    /// [`ToastQueue::install_global`]. Publishing through it is safe from any
    /// code path; expiries fire when the host drives
    /// `DeadlineScheduler::thread_default()`.
    pub fn global() -> ToastQueue {
        GLOBAL.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(|| {
                    ToastQueue::new(Rc::new(DeadlineScheduler::thread_default()))
                })
                .clone()
        })
    }

    /// Replace the thread's shared queue. Existing handles to the previous
    /// queue keep working but no longer reach new callers of `global()`.
    pub fn install_global(queue: ToastQueue) {
        GLOBAL.with(|slot| *slot.borrow_mut() = Some(queue));
    }

    pub fn settings(&self) -> &ToastSettings {
        &self.inner.settings
    }

    /// Publish a notice and return its id.
    ///
    /// `duration_ms = None` applies the default duration; `Some(0)` keeps the
    /// notice until it is dismissed or evicted.
    pub fn publish(
        &self,
        severity: Severity,
        title: impl Into<String>,
        description: Option<String>,
        duration_ms: Option<u64>,
    ) -> ToastId {
        self.publish_with(ToastOptions {
            severity,
            title: title.into(),
            description,
            duration_ms,
        })
    }

    pub fn publish_with(&self, options: ToastOptions) -> ToastId {
        let severity = options.severity;
        let duration_ms = options
            .duration_ms
            .unwrap_or(self.inner.settings.default_duration_ms);

        let id = {
            let mut state = self.inner.state.borrow_mut();
            let id = ToastId(state.next_id);
            state.next_id += 1;
            id
        };
        // Arm before committing: a scheduler panic must leave the queue unchanged.
        let timer = (duration_ms > 0).then(|| self.arm_expiry(id, duration_ms));

        let evicted: Vec<LiveToast> = {
            let mut state = self.inner.state.borrow_mut();
            state.items.push(LiveToast {
                toast: Toast {
                    id,
                    severity,
                    title: options.title,
                    description: options.description,
                    duration_ms,
                },
                timer,
            });
            let overflow = state
                .items
                .len()
                .saturating_sub(self.inner.settings.capacity);
            state.items.drain(..overflow).collect()
        };
        for live in evicted {
            self.release(live, Removal::Evicted);
        }

        tracing::debug!(%id, %severity, duration_ms, "toast published");
        self.notify();
        id
    }

    pub fn success(&self, title: impl Into<String>) -> ToastId {
        self.publish(Severity::Success, title, None, None)
    }

    pub fn error(&self, title: impl Into<String>) -> ToastId {
        self.publish(Severity::Error, title, None, None)
    }

    pub fn info(&self, title: impl Into<String>) -> ToastId {
        self.publish(Severity::Info, title, None, None)
    }

    pub fn warning(&self, title: impl Into<String>) -> ToastId {
        self.publish(Severity::Warning, title, None, None)
    }

    /// Remove a notice and cancel its timer. Unknown ids are ignored and do
    /// not notify subscribers.
    pub fn dismiss(&self, id: ToastId) {
        if self.remove(id, Removal::Dismissed) {
            self.notify();
        }
    }

    /// Dismiss every live notice with a single update.
    pub fn clear(&self) {
        let drained: Vec<LiveToast> = self.inner.state.borrow_mut().items.drain(..).collect();
        if drained.is_empty() {
            return;
        }
        for live in drained {
            self.release(live, Removal::Cleared);
        }
        self.notify();
    }

    /// Register a listener for snapshot updates.
    ///
    /// The listener is not called with the current state; it receives the
    /// next change onward. Dropping the returned [`Subscription`]
    /// unsubscribes.
    pub fn subscribe(&self, listener: impl Fn(&[Toast]) + 'static) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner.listeners.borrow_mut().push(Rc::new(ListenerSlot {
            id,
            active: Cell::new(true),
            callback: Box::new(listener),
        }));
        Subscription {
            queue: Rc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    /// Ordered copy of the live notices, oldest first.
    pub fn snapshot(&self) -> Vec<Toast> {
        self.inner
            .state
            .borrow()
            .items
            .iter()
            .map(|live| live.toast.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ToastId) -> bool {
        self.inner
            .state
            .borrow()
            .items
            .iter()
            .any(|live| live.toast.id == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn arm_expiry(&self, id: ToastId, duration_ms: u64) -> TimerHandle {
        let weak: Weak<QueueInner> = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule_after(
            duration_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    ToastQueue { inner }.expire(id);
                }
            }),
        )
    }

    fn expire(&self, id: ToastId) {
        if self.remove(id, Removal::Expired) {
            self.notify();
        }
    }

    fn remove(&self, id: ToastId, reason: Removal) -> bool {
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            state
                .items
                .iter()
                .position(|live| live.toast.id == id)
                .map(|index| state.items.remove(index))
        };
        match removed {
            Some(live) => {
                self.release(live, reason);
                true
            }
            None => {
                tracing::trace!(%id, ?reason, "toast already gone");
                false
            }
        }
    }

    fn release(&self, live: LiveToast, reason: Removal) {
        if let Some(timer) = live.timer {
            timer.cancel();
        }
        tracing::debug!(id = %live.toast.id, ?reason, "toast removed");
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        self.inner.outbox.borrow_mut().push_back(snapshot);
        if self.inner.delivering.replace(true) {
            return;
        }

        loop {
            let next = self.inner.outbox.borrow_mut().pop_front();
            let Some(snapshot) = next else {
                break;
            };
            let listeners: Vec<Rc<ListenerSlot>> = self.inner.listeners.borrow().clone();
            tracing::trace!(
                items = snapshot.len(),
                listeners = listeners.len(),
                "delivering toast snapshot"
            );
            for slot in listeners {
                if slot.active.get() {
                    (slot.callback)(&snapshot[..]);
                }
            }
        }

        self.inner.delivering.set(false);
    }

    fn unsubscribe(inner: &QueueInner, id: u64) {
        let mut listeners = inner.listeners.borrow_mut();
        if let Some(index) = listeners.iter().position(|slot| slot.id == id) {
            let slot = listeners.remove(index);
            slot.active.set(false);
        }
    }
}

impl fmt::Debug for ToastQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastQueue")
            .field("items", &self.snapshot())
            .field("subscribers", &self.subscriber_count())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

/// Listener registration. Unsubscribes on drop or on
/// [`Subscription::unsubscribe`].
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    queue: Weak<QueueInner>,
    id: Option<u64>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the listener registered for the queue's lifetime.
    pub fn detach(mut self) {
        self.id = None;
    }

    fn release(&mut self) {
        if let (Some(id), Some(inner)) = (self.id.take(), self.queue.upgrade()) {
            ToastQueue::unsubscribe(&inner, id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;

    fn queue() -> (ToastQueue, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        (ToastQueue::new(Rc::new(scheduler.clone())), scheduler)
    }

    fn recorded(queue: &ToastQueue) -> (Rc<RefCell<Vec<Vec<Toast>>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let sub = queue.subscribe(move |items| sink.borrow_mut().push(items.to_vec()));
        (log, sub)
    }

    fn titles(items: &[Toast]) -> Vec<&str> {
        items.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_publish_returns_unique_ids_and_appends() {
        let (q, _s) = queue();
        let a = q.info("a");
        let b = q.error("b");
        assert_ne!(a, b);
        assert_eq!(titles(&q.snapshot()), vec!["a", "b"]);
        assert_eq!(q.snapshot()[1].severity, Severity::Error);
    }

    #[test]
    fn test_default_duration_applied() {
        let (q, s) = queue();
        q.success("saved");
        assert_eq!(q.snapshot()[0].duration_ms, 5000);
        s.advance(4999);
        assert_eq!(q.len(), 1);
        s.advance(1);
        assert!(q.is_empty());
    }

    #[test]
    fn test_fourth_publish_evicts_oldest() {
        let (q, s) = queue();
        let first = q.publish(Severity::Error, "1", None, Some(0));
        q.info("2");
        q.info("3");
        q.success("4");

        assert_eq!(titles(&q.snapshot()), vec!["2", "3", "4"]);
        assert!(!q.contains(first));
        assert_eq!(s.pending(), 3);
    }

    #[test]
    fn test_eviction_cancels_timer() {
        let (q, s) = queue();
        q.publish(Severity::Info, "old", None, Some(100));
        q.publish(Severity::Info, "b", None, Some(0));
        q.publish(Severity::Info, "c", None, Some(0));
        assert_eq!(s.pending(), 1);

        q.publish(Severity::Info, "d", None, Some(0));
        assert_eq!(s.pending(), 0);
        assert_eq!(s.advance(1000), 0);
        assert_eq!(titles(&q.snapshot()), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_dismiss_unknown_is_silent_noop() {
        let (q, _s) = queue();
        let (log, _sub) = recorded(&q);
        let id = q.info("x");
        q.dismiss(id);
        q.dismiss(id);
        assert_eq!(log.borrow().len(), 2);
        assert!(q.is_empty());
    }

    #[test]
    fn test_subscriber_receives_full_snapshot() {
        let (q, _s) = queue();
        let (log, _sub) = recorded(&q);
        q.info("a");
        q.publish(Severity::Warning, "b", Some("details".to_string()), None);

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(titles(&log[1]), vec!["a", "b"]);
        assert_eq!(log[1][1].description.as_deref(), Some("details"));
    }

    #[test]
    fn test_unsubscribe_and_drop() {
        let (q, _s) = queue();
        let (log_a, sub_a) = recorded(&q);
        let (log_b, sub_b) = recorded(&q);
        assert_eq!(q.subscriber_count(), 2);

        sub_a.unsubscribe();
        q.info("one");
        drop(sub_b);
        q.info("two");

        assert!(log_a.borrow().is_empty());
        assert_eq!(log_b.borrow().len(), 1);
        assert_eq!(q.subscriber_count(), 0);
    }

    #[test]
    fn test_detached_subscription_stays_registered() {
        let (q, _s) = queue();
        let (log, sub) = recorded(&q);
        sub.detach();
        q.info("still heard");
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_listener_added_during_delivery_is_not_called_for_that_change() {
        let (q, _s) = queue();
        let late_calls = Rc::new(Cell::new(0));
        let held: Rc<RefCell<Vec<Subscription>>> = Rc::default();

        let q2 = q.clone();
        let calls = late_calls.clone();
        let held2 = held.clone();
        let _first = q.subscribe(move |_| {
            if held2.borrow().is_empty() {
                let calls = calls.clone();
                let sub = q2.subscribe(move |_| calls.set(calls.get() + 1));
                held2.borrow_mut().push(sub);
            }
        });

        q.info("a");
        assert_eq!(late_calls.get(), 0);
        q.info("b");
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn test_listener_can_publish_reentrantly() {
        let (q, _s) = queue();
        let q2 = q.clone();
        let _echo = q.subscribe(move |items| {
            if items.len() == 1 && items[0].severity == Severity::Error {
                q2.info("retrying");
            }
        });
        let (log, _sub) = recorded(&q);

        q.error("fetch failed");

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(titles(&log[0]), vec!["fetch failed"]);
        assert_eq!(titles(&log[1]), vec!["fetch failed", "retrying"]);
    }

    #[test]
    fn test_clear_cancels_all_timers_with_one_update() {
        let (q, s) = queue();
        q.info("a");
        q.info("b");
        let (log, _sub) = recorded(&q);

        q.clear();
        q.clear();
        assert!(q.is_empty());
        assert_eq!(s.pending(), 0);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_capacity_from_settings() {
        let s = ManualScheduler::new();
        let q = ToastQueue::with_settings(
            Rc::new(s),
            ToastSettings {
                capacity: 0,
                default_duration_ms: 10,
            },
        );
        q.info("a");
        q.info("b");
        assert_eq!(q.settings().capacity, 1);
        assert_eq!(titles(&q.snapshot()), vec!["b"]);
    }

    #[test]
    fn test_timer_after_queue_dropped_is_harmless() {
        let (q, s) = queue();
        q.info("orphan");
        drop(q);
        assert_eq!(s.advance(10_000), 1);
    }

    #[test]
    fn test_global_publish_outside_any_runtime() {
        let queue = ToastQueue::global();
        let id = queue.error("fetch failed");
        assert!(queue.contains(id));

        let timers = DeadlineScheduler::thread_default();
        assert_eq!(timers.pending(), 1);
        let later = tokio::time::Instant::now() + std::time::Duration::from_millis(5_000);
        assert_eq!(timers.fire_until(later), 1);
        assert!(ToastQueue::global().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_global_publish_in_runtime_without_local_set() {
        let id = ToastQueue::global().publish(Severity::Error, "fetch failed", None, None);
        assert!(ToastQueue::global().contains(id));
        assert_eq!(DeadlineScheduler::thread_default().pending(), 1);
    }

    #[test]
    fn test_failed_scheduling_leaves_queue_untouched() {
        struct Failing;
        impl Scheduler for Failing {
            fn schedule_after(&self, _: u64, _: crate::scheduler::TimerCallback) -> TimerHandle {
                panic!("no timer backend");
            }
        }

        let q = ToastQueue::new(Rc::new(Failing));
        let sticky = q.publish(Severity::Info, "sticky", None, Some(0));
        let attempt = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            q.publish(Severity::Error, "timed", None, Some(100))
        }));
        assert!(attempt.is_err());
        assert_eq!(q.snapshot().iter().map(|t| t.id).collect::<Vec<_>>(), vec![sticky]);
    }

    #[test]
    fn test_global_is_shared_per_thread() {
        let manual = ManualScheduler::new();
        ToastQueue::install_global(ToastQueue::new(Rc::new(manual.clone())));

        let id = ToastQueue::global().info("from anywhere");
        assert!(ToastQueue::global().contains(id));
        manual.advance(5000);
        assert!(ToastQueue::global().is_empty());
    }
}
