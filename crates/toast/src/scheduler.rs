//! One-shot timer scheduling.
//!
//! The queue never touches wall-clock timers directly. It asks a
//! [`Scheduler`] to run a callback after a delay and keeps the returned
//! [`TimerHandle`] so it can cancel the callback when the notice leaves the
//! queue early.
//!
//! Every scheduler here is single-threaded: callbacks are `!Send` and run on
//! the thread that scheduled them.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Callback run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Runs callbacks after a delay.
pub trait Scheduler {
    /// Schedule `callback` to run once, `delay_ms` from now.
    fn schedule_after(&self, delay_ms: u64, callback: TimerCallback) -> TimerHandle;
}

/// Cancellation handle for a scheduled callback.
///
/// Dropping the handle leaves the timer running; only [`TimerHandle::cancel`]
/// stops it. After `cancel` returns, the callback is guaranteed not to run.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to cancel.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Virtual-time scheduler driven explicitly with [`ManualScheduler::advance`].
///
/// Clones share the same timeline.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    now_ms: u64,
    next_seq: u64,
    /// Keyed by `(deadline, scheduling order)`.
    timers: BTreeMap<(u64, u64), TimerCallback>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> u64 {
        self.state.borrow().now_ms
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Move virtual time forward by `ms`, firing every timer that comes due
    /// in deadline order (ties in scheduling order). Callbacks may schedule
    /// or cancel other timers. Returns the number of callbacks run.
    pub fn advance(&self, ms: u64) -> usize {
        let target = self.state.borrow().now_ms.saturating_add(ms);
        let mut fired = 0;

        loop {
            let due = {
                let mut state = self.state.borrow_mut();
                match state.timers.first_key_value() {
                    Some((&(deadline, _), _)) if deadline <= target => {
                        state.now_ms = deadline;
                        state.timers.pop_first().map(|(_, cb)| cb)
                    }
                    _ => None,
                }
            };
            match due {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }

        self.state.borrow_mut().now_ms = target;
        fired
    }

    /// Advance to the next pending deadline and fire everything due then.
    pub fn run_next(&self) -> usize {
        let next = self
            .state
            .borrow()
            .timers
            .keys()
            .next()
            .map(|&(deadline, _)| deadline);
        match next {
            Some(deadline) => self.advance(deadline - self.now_ms()),
            None => 0,
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay_ms: u64, callback: TimerCallback) -> TimerHandle {
        let key = {
            let mut state = self.state.borrow_mut();
            let key = (state.now_ms.saturating_add(delay_ms), state.next_seq);
            state.next_seq += 1;
            state.timers.insert(key, callback);
            key
        };

        let weak: Weak<RefCell<ManualState>> = Rc::downgrade(&self.state);
        TimerHandle::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().timers.remove(&key);
            }
        })
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ManualScheduler")
            .field("now_ms", &state.now_ms)
            .field("pending", &state.timers.len())
            .finish()
    }
}

/// Upper bound for a single delay; longer delays are clamped to it.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

thread_local! {
    static THREAD_TIMERS: DeadlineScheduler = DeadlineScheduler::new();
}

/// Wall-clock timer table that can be scheduled into from any code path.
///
/// Scheduling and cancelling only edit a deadline-ordered table; no runtime
/// or `LocalSet` is needed. Timers fire when the host drives the table,
/// either by calling [`DeadlineScheduler::fire_due`] from its event loop or
/// by spawning [`DeadlineScheduler::run`] on a `LocalSet`.
///
/// Clones share the same table.
#[derive(Clone, Default)]
pub struct DeadlineScheduler {
    state: Rc<DeadlineState>,
}

#[derive(Default)]
struct DeadlineState {
    next_seq: Cell<u64>,
    timers: RefCell<BTreeMap<(Instant, u64), TimerCallback>>,
    wake: Notify,
}

impl DeadlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table shared by everything on the current thread. Backs the
    /// default global queue.
    pub fn thread_default() -> Self {
        THREAD_TIMERS.with(Clone::clone)
    }

    pub fn pending(&self) -> usize {
        self.state.timers.borrow().len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.state
            .timers
            .borrow()
            .keys()
            .next()
            .map(|&(deadline, _)| deadline)
    }

    /// Fire every timer whose deadline has passed.
    pub fn fire_due(&self) -> usize {
        self.fire_until(Instant::now())
    }

    /// Fire every timer due at or before `now`, in deadline order. Returns
    /// the number of callbacks run.
    pub fn fire_until(&self, now: Instant) -> usize {
        let mut fired = 0;
        loop {
            let due = {
                let mut timers = self.state.timers.borrow_mut();
                match timers.first_key_value() {
                    Some((&(deadline, _), _)) if deadline <= now => {
                        timers.pop_first().map(|(_, cb)| cb)
                    }
                    _ => None,
                }
            };
            let Some(callback) = due else {
                break;
            };
            callback();
            fired += 1;
        }
        if fired > 0 {
            tracing::trace!(fired, "deadline timers fired");
        }
        fired
    }

    /// Drive the table forever: sleep until the earliest deadline, fire,
    /// repeat. Wakes early when a sooner timer is scheduled. Spawn it with
    /// `tokio::task::spawn_local` and abort the task to stop.
    pub async fn run(self) {
        loop {
            let wake = self.state.wake.notified();
            match self.next_deadline() {
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {}
                        _ = wake => {}
                    }
                }
                None => wake.await,
            }
            self.fire_due();
        }
    }
}

impl Scheduler for DeadlineScheduler {
    fn schedule_after(&self, delay_ms: u64, callback: TimerCallback) -> TimerHandle {
        let now = Instant::now();
        let deadline = now
            .checked_add(Duration::from_millis(delay_ms).min(FAR_FUTURE))
            .unwrap_or(now);
        let seq = self.state.next_seq.get();
        self.state.next_seq.set(seq + 1);
        let key = (deadline, seq);
        self.state.timers.borrow_mut().insert(key, callback);
        self.state.wake.notify_one();

        let weak: Weak<DeadlineState> = Rc::downgrade(&self.state);
        TimerHandle::new(move || {
            if let Some(state) = weak.upgrade() {
                state.timers.borrow_mut().remove(&key);
            }
        })
    }
}

impl fmt::Debug for DeadlineScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadlineScheduler")
            .field("pending", &self.pending())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

/// Scheduler backed by tokio timers.
///
/// Each timer is a `spawn_local` task, so scheduling must happen inside a
/// `tokio::task::LocalSet` on a current-thread runtime; `spawn_local` panics
/// anywhere else. Code that may publish from outside a `LocalSet` should use
/// [`DeadlineScheduler`]. Cancelling aborts the task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_after(&self, delay_ms: u64, callback: TimerCallback) -> TimerHandle {
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            callback();
        });
        TimerHandle::new(move || task.abort())
    }
}
