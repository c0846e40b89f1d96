use crate::error::{CollError, Result};
use crate::protocol::Envelope;
use crate::types::{Rank, Tag};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Envelope>>>;

struct Slot {
    tx: mpsc::UnboundedSender<Envelope>,
    rx: SharedReceiver,
}

impl Slot {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }
}

/// One pending `recv` on a slot. Dropping it removes the slot when no other
/// receiver shares it and nothing is queued.
struct Waiting<'a> {
    mailbox: &'a Mailbox,
    key: (Rank, Tag),
    rx: SharedReceiver,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        let mut slots = self.mailbox.slots();
        let Some(slot) = slots.get(&self.key) else {
            return;
        };
        let only_us = Arc::ptr_eq(&slot.rx, &self.rx) && Arc::strong_count(&self.rx) == 2;
        if !only_us {
            return;
        }
        if let Ok(rx) = self.rx.try_lock() {
            if rx.is_empty() {
                slots.remove(&self.key);
            }
        }
    }
}

/// Envelopes that reached this rank, keyed by `(source, tag)`.
///
/// Arrivals and receivers may come in either order: whichever side touches a
/// key first creates its slot. A slot is dropped once it is drained and no
/// receiver is waiting on it, so the map only holds keys with traffic in
/// flight.
#[derive(Default)]
pub(crate) struct Mailbox {
    slots: Mutex<HashMap<(Rank, Tag), Slot>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<(Rank, Tag), Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// File an envelope under its `(source, tag)` key.
    pub fn deliver(&self, envelope: Envelope) {
        let key = (envelope.source, envelope.tag);
        let mut slots = self.slots();
        let slot = slots.entry(key).or_insert_with(Slot::new);
        // The slot owns a receiver, so the channel cannot be closed here.
        let _ = slot.tx.send(envelope);
    }

    /// Wait for the next envelope filed under `(source, tag)`.
    ///
    /// The slot is released once it is drained, including when the caller
    /// gives up on the wait (timeout or cancellation drops this future).
    pub async fn recv(&self, source: Rank, tag: Tag) -> Result<Envelope> {
        let waiting = Waiting {
            mailbox: self,
            key: (source, tag),
            rx: {
                let mut slots = self.slots();
                Arc::clone(&slots.entry((source, tag)).or_insert_with(Slot::new).rx)
            },
        };
        let mut guard = waiting.rx.lock().await;
        let envelope = guard.recv().await;
        drop(guard);
        envelope.ok_or(CollError::PeerDisconnected { rank: source })
    }

    /// Number of keys currently holding a slot.
    #[cfg(test)]
    pub fn open_slots(&self) -> usize {
        self.slots().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Body;
    use std::time::Duration;

    fn env(source: Rank, tag: Tag, byte: u8) -> Envelope {
        Envelope::new(source, 0, tag, Body::Data(vec![byte]))
    }

    #[tokio::test]
    async fn test_deliver_then_recv_in_order() {
        let mb = Mailbox::new();
        mb.deliver(env(1, 7, 1));
        mb.deliver(env(1, 7, 2));
        assert_eq!(mb.recv(1, 7).await.unwrap().body, Body::Data(vec![1]));
        assert_eq!(mb.recv(1, 7).await.unwrap().body, Body::Data(vec![2]));
        assert_eq!(mb.open_slots(), 0);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let mb = Mailbox::new();
        mb.deliver(env(2, 1, 20));
        mb.deliver(env(1, 1, 10));
        mb.deliver(env(1, 2, 12));
        assert_eq!(mb.recv(1, 2).await.unwrap().body, Body::Data(vec![12]));
        assert_eq!(mb.recv(1, 1).await.unwrap().body, Body::Data(vec![10]));
        assert_eq!(mb.recv(2, 1).await.unwrap().body, Body::Data(vec![20]));
    }

    #[tokio::test]
    async fn test_recv_before_deliver() {
        let mb = Arc::new(Mailbox::new());
        let waiter = {
            let mb = Arc::clone(&mb);
            tokio::spawn(async move { mb.recv(3, 9).await })
        };
        tokio::task::yield_now().await;
        mb.deliver(env(3, 9, 5));
        let got = waiter.await.unwrap().unwrap();
        assert_eq!(got.body, Body::Data(vec![5]));
        assert_eq!(mb.open_slots(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_recv_releases_slot() {
        let mb = Mailbox::new();
        let waited = tokio::time::timeout(Duration::from_millis(20), mb.recv(4, 2)).await;
        assert!(waited.is_err());
        assert_eq!(mb.open_slots(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_recv_keeps_other_waiter() {
        let mb = Arc::new(Mailbox::new());
        let waiter = {
            let mb = Arc::clone(&mb);
            tokio::spawn(async move { mb.recv(4, 2).await })
        };
        tokio::task::yield_now().await;
        let waited = tokio::time::timeout(Duration::from_millis(20), mb.recv(4, 2)).await;
        assert!(waited.is_err());
        assert_eq!(mb.open_slots(), 1);

        mb.deliver(env(4, 2, 8));
        assert_eq!(waiter.await.unwrap().unwrap().body, Body::Data(vec![8]));
        assert_eq!(mb.open_slots(), 0);
    }

    #[tokio::test]
    async fn test_undrained_slot_is_kept() {
        let mb = Mailbox::new();
        mb.deliver(env(1, 1, 1));
        mb.deliver(env(1, 1, 2));
        mb.recv(1, 1).await.unwrap();
        assert_eq!(mb.open_slots(), 1);
    }
}
