// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Change notification for the primary slot.
//!
//! Best-effort broadcast fired after every successful write. Observers use it
//! to refresh their views; storage correctness never depends on delivery.

use tokio::sync::broadcast;

/// Buffered events per receiver before slow receivers start lagging.
const CHANNEL_CAPACITY: usize = 32;

/// Kind of write that just hit the primary slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageChange {
    Saved,
    VaultEnabled,
    VaultDisabled,
    Imported,
    Reset,
}

/// Broadcast sender shared by the vault manager.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<StorageChange>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.sender.subscribe()
    }

    /// Fire an event. Having no observers is fine.
    pub fn notify(&self, change: StorageChange) {
        let delivered = self.sender.send(change).unwrap_or(0);
        tracing::trace!(?change, observers = delivered, "Storage change emitted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_without_observers_is_noop() {
        ChangeNotifier::new().notify(StorageChange::Saved);
    }

    #[test]
    fn every_observer_receives_events() {
        let notifier = ChangeNotifier::new();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        notifier.notify(StorageChange::VaultEnabled);
        notifier.notify(StorageChange::Saved);

        assert_eq!(a.try_recv().unwrap(), StorageChange::VaultEnabled);
        assert_eq!(a.try_recv().unwrap(), StorageChange::Saved);
        assert_eq!(b.try_recv().unwrap(), StorageChange::VaultEnabled);
        assert!(a.try_recv().is_err());
    }
}
