//! The mailbox: a FIFO queue with a wake signal, the only ingress into the
//! aggregation engine (spec §4.1). Modeled as a tagged sum type carried over
//! a `tokio::sync::mpsc` channel — multiple producers, one consumer, strict
//! FIFO ordering across producers.

use crate::digest::Digest;
use crate::model::VerifyResult;
use tokio::sync::{mpsc, oneshot};

/// The message shapes the engine's event loop understands.
pub enum Message {
    /// A transaction ID submitted for registration.
    Submit(Digest),
    /// Posted by the timer component on expiry.
    Timer,
    /// A verification request: the caller's `oneshot` sender is the
    /// completion signal, filled with the result slot.
    Verify(Digest, oneshot::Sender<VerifyResult>),
    /// Re-arm the engine-owned timer (spec §4.7: "enable() ... arms the
    /// timer").
    Enable,
    /// Cancel the engine-owned timer (spec §4.7: "disable() cancels the
    /// timer").
    Disable,
}

/// The producer half — cheaply cloneable, handed to the timer and to every
/// caller of `register`/`verify`.
#[derive(Clone)]
pub struct MailboxSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl MailboxSender {
    /// Non-blocking append; wakes the consumer.
    pub fn append(&self, msg: Message) -> Result<(), Message> {
        self.tx.send(msg).map_err(|e| e.0)
    }
}

/// The single-consumer half, owned exclusively by the aggregation engine.
pub struct Mailbox {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Mailbox {
    #[must_use]
    pub fn new() -> (MailboxSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MailboxSender { tx }, Self { rx })
    }

    /// Block until at least one message is available; returns the head.
    /// `None` means every sender has been dropped (shutdown).
    pub async fn wait(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Drain whatever is queued without blocking — used on shutdown, not at
    /// steady state.
    pub fn flush(&mut self) -> Vec<Message> {
        let mut drained = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            drained.push(msg);
        }
        drained
    }
}
