//! A recurring single-shot timer, rearmed on every tree close (spec §4.2).
//! Modeled as a cancellable `tokio::task` that sleeps and then posts
//! `Message::Timer`; rearming simply aborts the previous task and spawns a
//! fresh one, which makes rearm idempotent and cancellation best-effort (a
//! task already past its sleep when aborted may still deliver its message —
//! the engine treats a late firing while disabled as a no-op, per spec §4.2).

use crate::mailbox::{MailboxSender, Message};
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Timer {
    period: Duration,
    sender: MailboxSender,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    #[must_use]
    pub fn new(period: Duration, sender: MailboxSender) -> Self {
        Self {
            period,
            sender,
            handle: None,
        }
    }

    /// Cancel any outstanding timer and start a fresh one.
    pub fn rearm(&mut self) {
        self.cancel();
        let sender = self.sender.clone();
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(period).await;
            let _ = sender.append(Message::Timer);
        }));
    }

    /// Best-effort cancellation: aborts the sleeping task if it hasn't fired
    /// yet. A firing already in flight is not retracted.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}
