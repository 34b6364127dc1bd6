//! Thrash protection: one successful mutation per namespace/app per window.
//!
//! Entries are never removed, only compared against the window. The lock
//! guards the in-memory maps only and is never held across an await.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use super::CooldownKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppressed {
    /// Last success for the key is younger than the window.
    CoolingDown { remaining: Duration },
    /// Another delivery is mutating the same key right now.
    InFlight,
}

#[derive(Default)]
struct CooldownState {
    last_success: HashMap<CooldownKey, Instant>,
    in_flight: HashSet<CooldownKey>,
}

pub struct CooldownGuard {
    window: Duration,
    state: Mutex<CooldownState>,
}

impl CooldownGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(CooldownState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CooldownState> {
        // The maps stay consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_cooling_down(&self, key: &CooldownKey) -> bool {
        self.remaining(&self.lock(), key, Instant::now()).is_some()
    }

    pub fn record_cooldown(&self, key: &CooldownKey) {
        self.lock().last_success.insert(key.clone(), Instant::now());
    }

    /// Checks the window and claims the key in one critical section.
    ///
    /// The returned permit must be [`commit`](CooldownPermit::commit)ted once
    /// the mutation succeeded; dropping it uncommitted leaves the key free for
    /// the next delivery.
    pub fn try_acquire(&self, key: &CooldownKey) -> Result<CooldownPermit<'_>, Suppressed> {
        let mut state = self.lock();

        if let Some(remaining) = self.remaining(&state, key, Instant::now()) {
            return Err(Suppressed::CoolingDown { remaining });
        }
        if !state.in_flight.insert(key.clone()) {
            return Err(Suppressed::InFlight);
        }

        Ok(CooldownPermit {
            guard: self,
            key: key.clone(),
            committed: false,
        })
    }

    fn remaining(&self, state: &CooldownState, key: &CooldownKey, now: Instant) -> Option<Duration> {
        let last = state.last_success.get(key)?;
        let elapsed = now.saturating_duration_since(*last);
        (elapsed < self.window).then(|| self.window - elapsed)
    }

    fn release(&self, key: &CooldownKey, succeeded: bool) {
        let mut state = self.lock();
        state.in_flight.remove(key);
        if succeeded {
            state.last_success.insert(key.clone(), Instant::now());
        }
    }
}

/// Exclusive claim on a cooldown key for the duration of one mutation.
#[must_use = "dropping the permit releases the key without recording a cooldown"]
pub struct CooldownPermit<'a> {
    guard: &'a CooldownGuard,
    key: CooldownKey,
    committed: bool,
}

impl CooldownPermit<'_> {
    /// Records the cooldown for the key.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for CooldownPermit<'_> {
    fn drop(&mut self) {
        self.guard.release(&self.key, self.committed);
    }
}
