use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

/// [`OnSignal`] is a one-way atomic flag used to communicate a single
/// on/off state across threads, e.g. the shutdown request for the pool
/// worker threads.
#[derive(Debug)]
pub struct OnSignal {
    state: AtomicBool,
}

impl Default for OnSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl OnSignal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicBool::new(false),
        }
    }

    /// `turn_on` flips the state from off to on, returning true only for
    /// the caller that performed the transition.
    #[inline]
    pub fn turn_on(&self) -> bool {
        self.state
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
    }

    /// `turn_off` flips the state from on to off, returning true only for
    /// the caller that performed the transition.
    #[inline]
    pub fn turn_off(&self) -> bool {
        self.state
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
    }

    /// `probe` returns true when the state is on.
    #[inline]
    #[must_use]
    pub fn probe(&self) -> bool {
        self.state.load(Ordering::Acquire)
    }
}

/// [`WakeLatch`] lets a thread sleep silently (no CPU spin) until another
/// thread delivers a wake-up through the underlying `Condvar`.
///
/// The latch counts wake-ups with a generation number so a sleeper can
/// grab a [`WakeLatch::ticket`] before its final work check and then call
/// [`WakeLatch::wait_past`]: a wake-up delivered between the two calls is
/// never lost, the wait returns immediately.
pub struct WakeLatch {
    generation: Mutex<u64>,
    event: Condvar,
}

impl Default for WakeLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeLatch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            event: Condvar::new(),
        }
    }

    /// `ticket` samples the current wake generation. Take the ticket
    /// before the last check for work, then sleep with `wait_past`.
    #[must_use]
    pub fn ticket(&self) -> u64 {
        *self.generation.lock().unwrap()
    }

    /// `wake_all` advances the generation and wakes every sleeper.
    pub fn wake_all(&self) {
        let mut generation = self.generation.lock().unwrap();
        *generation += 1;
        drop(generation);

        self.event.notify_all();
    }

    /// `wait_past` sleeps until the generation moves past the provided
    /// ticket. Returns immediately when a wake-up already happened since
    /// the ticket was taken.
    pub fn wait_past(&self, ticket: u64) {
        let mut generation = self.generation.lock().unwrap();
        while *generation == ticket {
            generation = self.event.wait(generation).unwrap();
        }
    }
}
