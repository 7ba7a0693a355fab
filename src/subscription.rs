//! Per-window event-stream subscriptions.
//!
//! Placeholder windows cannot be dragged through the compositor's native
//! move grab, so the controller listens to each window's own event stream
//! for a modifier-drag gesture.  [`WindowSubscriptions`] keeps at most one
//! subscription per window and releases them when the window goes away.

use crate::event::WindowId;
use crate::traits::{Shell, SubscriptionToken};
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct WindowSubscriptions {
    active: HashMap<WindowId, SubscriptionToken>,
}

impl WindowSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self, window: WindowId) -> bool {
        self.active.contains_key(&window)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Subscribe to every managed window that has no subscription yet.
    ///
    /// Returns the number of new subscriptions.
    pub fn sync<S: Shell>(&mut self, shell: &mut S) -> usize {
        let mut added = 0;
        for window in shell.windows() {
            if self.active.contains_key(&window) {
                continue;
            }
            let token = shell.subscribe_window(window);
            debug!("subscribed to {} ({:?})", window, token);
            self.active.insert(window, token);
            added += 1;
        }
        added
    }

    /// Release the subscription of `window`, if any.
    pub fn release<S: Shell>(&mut self, shell: &mut S, window: WindowId) -> bool {
        match self.active.remove(&window) {
            Some(token) => {
                shell.unsubscribe(token);
                debug!("released subscription of {}", window);
                true
            }
            None => false,
        }
    }

    /// Release every subscription.
    pub fn release_all<S: Shell>(&mut self, shell: &mut S) {
        for (_, token) in self.active.drain() {
            shell.unsubscribe(token);
        }
    }
}
