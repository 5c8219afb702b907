// Re-entry detection for the fixed-rate tick handler.
//
// A tick that fires while the previous one is still running is a hard real-time fault. The gate
// reports it to the caller as `ControlError::Overrun` and counts it; it never drops it silently.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::ControlError;

pub struct TickGate {
    busy: AtomicBool,
    overruns: AtomicU32,
}

/// Proof that a tick is in progress; leaving the tick is dropping the token.
pub struct TickToken<'a> {
    gate: &'a TickGate,
}

impl TickGate {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            overruns: AtomicU32::new(0),
        }
    }

    /// Marks the start of a tick.
    pub fn enter(&self) -> Result<TickToken<'_>, ControlError> {
        if self.busy.swap(true, Ordering::Acquire) {
            return Err(self.record_overrun());
        }
        Ok(TickToken { gate: self })
    }

    /// Counts a tick lost outside `enter()`, e.g. a handler that could not be scheduled.
    pub fn record_overrun(&self) -> ControlError {
        self.overruns.fetch_add(1, Ordering::Relaxed);
        ControlError::Overrun
    }

    /// Runs `f` as one tick.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Result<R, ControlError> {
        let _token = self.enter()?;
        Ok(f())
    }

    #[inline(always)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }

    /// Number of rejected re-entries so far.
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }
}

impl Default for TickGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TickToken<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ticks_pass() {
        let gate = TickGate::new();
        for i in 0..3 {
            assert_eq!(gate.run(|| i * 2), Ok(i * 2));
        }
        assert!(!gate.is_busy());
        assert_eq!(gate.overruns(), 0);
    }

    #[test]
    fn reentry_is_overrun() {
        let gate = TickGate::new();
        let outer = gate.run(|| {
            assert!(gate.is_busy());
            gate.run(|| ())
        });
        assert_eq!(outer, Ok(Err(ControlError::Overrun)));
        assert_eq!(gate.overruns(), 1);
        assert!(!gate.is_busy());

        // The gate recovers for the next tick
        assert!(gate.enter().is_ok());
    }

    #[test]
    fn lost_tick_is_counted() {
        let gate = TickGate::new();

        // Gate entered but the tick could not be handed over: token released, tick counted
        let token = gate.enter().unwrap();
        drop(token);
        assert_eq!(gate.record_overrun(), ControlError::Overrun);
        assert!(!gate.is_busy());
        assert_eq!(gate.overruns(), 1);

        assert!(gate.enter().is_ok());
        assert_eq!(gate.overruns(), 1);
    }
}
