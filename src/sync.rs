//! Task-synchronization primitives.
//!
//! The three tasks coordinate through exactly three primitives, mirroring
//! the FreeRTOS objects the scheduler provides natively:
//!
//! | Primitive      | FreeRTOS analogue        | Producer → consumer            |
//! |----------------|--------------------------|--------------------------------|
//! | [`BoundedMutex`]| mutex + timed take      | ranging task → blink task      |
//! | [`ToggleSignal`]| binary semaphore        | button ISR → ranging task      |
//! | [`EventFlags`] | event group (bitmask)    | ranging task → any observer    |
//!
//! Every acquisition is bounded — no path in a task loop blocks forever,
//! so one stalled peer can never starve a scheduling slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Bounded-wait mutex
// ---------------------------------------------------------------------------

/// Retry granularity for [`BoundedMutex::lock_within`].  Contention on the
/// shared reading lasts microseconds (read-copy-release discipline), so a
/// millisecond retry step resolves well under every configured bound.
const LOCK_RETRY_STEP: Duration = Duration::from_millis(1);

/// A mutex whose acquisition is always bounded by a caller-supplied wait.
///
/// `std::sync::Mutex` (pthread-backed on ESP-IDF) offers only unbounded
/// `lock()` and zero-wait `try_lock()`; the timed take in between is built
/// here from a try/sleep loop.  Timeout is an expected soft failure under
/// contention, not an error — callers drop the access and carry on.
pub struct BoundedMutex<T> {
    inner: Mutex<T>,
}

impl<T> BoundedMutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Attempt to acquire the lock, giving up after `timeout`.
    ///
    /// Returns `None` on expiry.  A poisoned lock is recovered rather than
    /// propagated — no invariant of the protected value outlives a holder
    /// panic (readings are replaced wholesale).
    pub fn lock_within(&self, timeout: Duration) -> Option<MutexGuard<'_, T>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.inner.try_lock() {
                Ok(guard) => return Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {}
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(LOCK_RETRY_STEP);
        }
    }

    /// Zero-wait acquisition attempt.
    pub fn try_lock_now(&self) -> Option<MutexGuard<'_, T>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Toggle signal (binary semaphore)
// ---------------------------------------------------------------------------

/// One-unit signal from the button ISR to the ranging task.
///
/// `give()` saturates at a single outstanding unit, so rapid edges arriving
/// before the consumer polls again coalesce into one toggle — the same
/// behavior as a FreeRTOS binary semaphore, and the property the debounce
/// design in the ranging task relies on.
///
/// Both sides are single atomic operations, making `give()` safe to call
/// from interrupt context.
pub struct ToggleSignal {
    pending: AtomicBool,
}

impl Default for ToggleSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ToggleSignal {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Raise the signal.  Lock-free, ISR-safe.
    pub fn give(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consume the signal if one is pending (zero-wait probe).
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

// ---------------------------------------------------------------------------
// Event flags (bitmask broadcast)
// ---------------------------------------------------------------------------

/// Bit announcing "ranging active" on the system [`EventFlags`].
pub const RANGING_ACTIVE: u32 = 1 << 0;

/// Multi-reader bitmask broadcast.
///
/// The ranging task is the sole writer; any number of observers may wait on
/// bits concurrently.  Waits are level-triggered and never consume bits —
/// an observer re-reads the current mask on every wakeup, exactly like a
/// FreeRTOS event group with clear-on-exit disabled.
pub struct EventFlags {
    bits: Mutex<u32>,
    changed: Condvar,
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFlags {
    pub fn new() -> Self {
        Self {
            bits: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    /// Set `mask` bits and wake all waiters.
    pub fn set(&self, mask: u32) {
        let mut bits = self.bits.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *bits |= mask;
        self.changed.notify_all();
    }

    /// Clear `mask` bits and wake all waiters.
    pub fn clear(&self, mask: u32) {
        let mut bits = self.bits.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *bits &= !mask;
        self.changed.notify_all();
    }

    /// Snapshot of the current bits.
    pub fn get(&self) -> u32 {
        *self.bits.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Wait until any bit in `mask` is set, bounded by `timeout`.
    ///
    /// Returns the current bits either way — on timeout the caller still
    /// observes the live level, which is what keeps the status task's OFF
    /// branch reachable.
    pub fn wait_any(&self, mask: u32, timeout: Duration) -> u32 {
        let deadline = Instant::now() + timeout;
        let mut bits = self.bits.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        loop {
            if *bits & mask != 0 {
                return *bits;
            }
            let now = Instant::now();
            if now >= deadline {
                return *bits;
            }
            let (guard, _result) = self
                .changed
                .wait_timeout(bits, deadline - now)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            bits = guard;
        }
    }
}

// ---------------------------------------------------------------------------
// Shutdown token
// ---------------------------------------------------------------------------

/// Cooperative cancellation token checked at the top of every task loop.
///
/// On the device nothing ever requests shutdown — the loops are always-on.
/// Host test harnesses use it to terminate the real task loops cleanly.
#[derive(Default)]
pub struct Shutdown {
    requested: AtomicBool,
}

impl Shutdown {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
        }
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn toggle_gives_coalesce_to_one_take() {
        let sig = ToggleSignal::new();
        sig.give();
        sig.give();
        sig.give();
        assert!(sig.take(), "first take consumes the coalesced unit");
        assert!(!sig.take(), "second take finds nothing pending");
    }

    #[test]
    fn toggle_take_on_empty_is_false() {
        let sig = ToggleSignal::new();
        assert!(!sig.take());
    }

    #[test]
    fn bounded_lock_times_out_under_contention() {
        let m = Arc::new(BoundedMutex::new(0u32));
        let m2 = Arc::clone(&m);

        let holder = thread::spawn(move || {
            let _guard = m2.lock_within(Duration::from_millis(100)).unwrap();
            thread::sleep(Duration::from_millis(120));
        });
        thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        assert!(m.lock_within(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() < Duration::from_millis(110));

        holder.join().unwrap();
        assert!(m.lock_within(Duration::from_millis(30)).is_some());
    }

    #[test]
    fn bounded_lock_acquires_uncontended() {
        let m = BoundedMutex::new(7u32);
        let guard = m.lock_within(Duration::from_millis(5)).unwrap();
        assert_eq!(*guard, 7);
    }

    #[test]
    fn event_flags_are_level_triggered() {
        let flags = EventFlags::new();
        flags.set(RANGING_ACTIVE);

        // Two consecutive waits both observe the bit — nothing is consumed.
        assert_eq!(flags.wait_any(RANGING_ACTIVE, Duration::from_millis(5)) & RANGING_ACTIVE, RANGING_ACTIVE);
        assert_eq!(flags.wait_any(RANGING_ACTIVE, Duration::from_millis(5)) & RANGING_ACTIVE, RANGING_ACTIVE);

        flags.clear(RANGING_ACTIVE);
        assert_eq!(flags.wait_any(RANGING_ACTIVE, Duration::from_millis(5)), 0);
    }

    #[test]
    fn event_flags_wake_multiple_waiters() {
        let flags = Arc::new(EventFlags::new());
        let mut handles = Vec::new();
        for _ in 0..3 {
            let f = Arc::clone(&flags);
            handles.push(thread::spawn(move || {
                f.wait_any(RANGING_ACTIVE, Duration::from_secs(2))
            }));
        }
        thread::sleep(Duration::from_millis(30));
        flags.set(RANGING_ACTIVE);
        for h in handles {
            assert_eq!(h.join().unwrap() & RANGING_ACTIVE, RANGING_ACTIVE);
        }
    }

    #[test]
    fn shutdown_flag_round_trip() {
        let token = Shutdown::new();
        assert!(!token.is_requested());
        token.request();
        assert!(token.is_requested());
    }
}
