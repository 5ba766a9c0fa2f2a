//! [`StopSignal`] – cooperative cancellation for the run loop.
//!
//! Clone it into a Ctrl-C handler (or a test harness) and call
//! [`StopSignal::raise`]; the loop checks it once per cycle and unwinds
//! through the environment guard.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this signal to stop.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_lowered() {
        assert!(!StopSignal::new().is_raised());
    }

    #[test]
    fn raise_is_visible_through_clones() {
        let signal = StopSignal::new();
        let handler_copy = signal.clone();
        handler_copy.raise();
        assert!(signal.is_raised());
    }

    #[test]
    fn raise_from_another_thread() {
        let signal = StopSignal::new();
        let remote = signal.clone();
        std::thread::spawn(move || remote.raise()).join().unwrap();
        assert!(signal.is_raised());
    }
}
