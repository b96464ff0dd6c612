//! Overlay visibility controller
//!
//! Listens for [`VisibilityMessage`]s and shows or hides an overlay window.
//! The pinned preference always wins; an `Unknown` signal leaves the window
//! as it is.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::messaging::{Messenger, SubscriberId, VisibilityMessage, VisibilitySignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Visible => f.write_str("visible"),
            Visibility::Hidden => f.write_str("hidden"),
        }
    }
}

/// The window being shown or hidden
pub trait OverlayWindow: Send {
    fn visibility(&self) -> Visibility;
    fn set_visibility(&mut self, visibility: Visibility);
}

/// Source of visibility messages; asked once for the current state on attach
pub trait VisibilityDetector {
    /// Publish a message describing the current state right away
    fn force_refresh(&self);
}

/// Read access to the "pinned" preference at message time.
/// Must not block on the settings store lock: the UI thread may publish while
/// holding it. Use `SettingsStore::pinned_flag` for the stored preference.
pub trait PinnedPreference: Send + Sync {
    fn is_pinned(&self) -> bool;
}

impl PinnedPreference for AtomicBool {
    fn is_pinned(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Next window state for a received signal
pub fn resolve_visibility(
    pinned: bool,
    signal: VisibilitySignal,
    current: Visibility,
) -> Visibility {
    if pinned {
        return Visibility::Visible;
    }
    match signal {
        VisibilitySignal::Visible => Visibility::Visible,
        VisibilitySignal::Hidden => Visibility::Hidden,
        // Detector couldn't tell; don't flicker
        VisibilitySignal::Unknown => current,
    }
}

pub struct OverlayController<W> {
    id: SubscriberId,
    view_model: Option<SubscriberId>,
    messenger: Arc<Messenger>,
    window: Arc<Mutex<W>>,
    attached: bool,
}

impl<W: OverlayWindow + 'static> OverlayController<W> {
    /// Subscribe `window` to visibility messages, then ask the detector for
    /// the current state so the window starts out correct.
    pub fn attach(
        messenger: Arc<Messenger>,
        pinned: Arc<dyn PinnedPreference>,
        window: W,
        detector: &dyn VisibilityDetector,
    ) -> Self {
        let id = SubscriberId::next();
        let window = Arc::new(Mutex::new(window));

        let target = Arc::clone(&window);
        messenger.register(id, move |message: &VisibilityMessage| {
            let pinned = pinned.is_pinned();
            let mut window = lock_window(&target);
            let current = window.visibility();
            let next = resolve_visibility(pinned, message.signal, current);
            if next != current {
                debug!(
                    from = %current,
                    to = %next,
                    signal = %message.signal,
                    pinned,
                    "Overlay visibility changed"
                );
                window.set_visibility(next);
            }
        });

        info!(subscriber = ?id, "Overlay attached, requesting initial visibility");
        detector.force_refresh();

        Self {
            id,
            view_model: None,
            messenger,
            window,
            attached: true,
        }
    }
}

impl<W> OverlayController<W> {
    /// Tie a view model's subscriptions to this controller's lifetime
    pub fn with_view_model(mut self, view_model: SubscriberId) -> Self {
        self.view_model = Some(view_model);
        self
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn window(&self) -> Arc<Mutex<W>> {
        Arc::clone(&self.window)
    }

    /// Unsubscribe the view model and the controller. Safe to call twice.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        if let Some(view_model) = self.view_model.take() {
            self.messenger.unregister(view_model);
        }
        self.messenger.unregister(self.id);
        self.attached = false;
        info!(subscriber = ?self.id, "Overlay detached");
    }
}

impl<W: OverlayWindow> OverlayController<W> {
    pub fn state(&self) -> Visibility {
        lock_window(&self.window).visibility()
    }
}

impl<W> Drop for OverlayController<W> {
    fn drop(&mut self) {
        self.detach();
    }
}

fn lock_window<W>(window: &Mutex<W>) -> MutexGuard<'_, W> {
    window.lock().unwrap_or_else(PoisonError::into_inner)
}
