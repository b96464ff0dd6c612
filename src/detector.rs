//! Detector fed from the outside (stdin, tests) instead of probing processes

use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::messaging::{Messenger, VisibilityMessage, VisibilitySignal};
use crate::overlay::VisibilityDetector;

pub struct ScriptedDetector {
    messenger: Arc<Messenger>,
    current: Mutex<VisibilitySignal>,
}

impl ScriptedDetector {
    pub fn new(messenger: Arc<Messenger>) -> Self {
        Self {
            messenger,
            current: Mutex::new(VisibilitySignal::Unknown),
        }
    }

    pub fn current(&self) -> VisibilitySignal {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new signal; publishes only if it differs from the last one
    pub fn report(&self, signal: VisibilitySignal) -> bool {
        let changed = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == signal {
                false
            } else {
                *current = signal;
                true
            }
        };

        if changed {
            debug!(signal = %signal, "Target visibility changed");
            self.messenger.publish(&VisibilityMessage::new(signal));
        }
        changed
    }
}

impl VisibilityDetector for ScriptedDetector {
    fn force_refresh(&self) {
        let signal = self.current();
        debug!(signal = %signal, "Forced visibility refresh");
        self.messenger.publish(&VisibilityMessage::new(signal));
    }
}
