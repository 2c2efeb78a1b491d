//! Bounded point-to-point channels between cores

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use rondo_core::{ChannelId, CoreId, MetricMap, RondoError, RondoResult, StateValue, Timestamp};

/// A message sent through a channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub from: CoreId,
    pub to: CoreId,
    pub timestamp: Timestamp,
    pub payload: StateValue,
    pub metadata: MetricMap,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<CoreId>,
        to: impl Into<CoreId>,
        payload: StateValue,
    ) -> Self {
        Message {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            timestamp: Timestamp::now(),
            payload,
            metadata: MetricMap::new(),
        }
    }
}

struct Mailbox {
    buffer: VecDeque<Message>,
    open: bool,
}

/// Bounded point-to-point mailbox between two cores.
///
/// `send` never blocks: a full buffer or a closed channel is an immediate
/// error and the caller decides whether to retry. `receive` suspends the
/// calling task until a message arrives or the channel closes.
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub from: CoreId,
    pub to: CoreId,
    capacity: usize,
    mailbox: Mutex<Mailbox>,
    notify: Notify,
    sent: AtomicU64,
}

impl Channel {
    /// Create a channel. Channels start closed and must be opened before
    /// use.
    pub fn new(
        id: impl Into<ChannelId>,
        name: impl Into<String>,
        from: impl Into<CoreId>,
        to: impl Into<CoreId>,
        capacity: usize,
    ) -> Self {
        Channel {
            id: id.into(),
            name: name.into(),
            from: from.into(),
            to: to.into(),
            capacity,
            mailbox: Mutex::new(Mailbox {
                buffer: VecDeque::with_capacity(capacity),
                open: false,
            }),
            notify: Notify::new(),
            sent: AtomicU64::new(0),
        }
    }

    pub fn open(&self) -> RondoResult<()> {
        let mut mailbox = self.mailbox.lock();
        if mailbox.open {
            return Err(RondoError::AlreadyOpen {
                kind: "channel",
                id: self.id.to_string(),
            });
        }
        mailbox.open = true;
        Ok(())
    }

    /// Close the channel and wake every blocked receiver.
    pub fn close(&self) -> RondoResult<()> {
        {
            let mut mailbox = self.mailbox.lock();
            if !mailbox.open {
                return Err(RondoError::Closed {
                    kind: "channel",
                    id: self.id.to_string(),
                });
            }
            mailbox.open = false;
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// Non-blocking send: fails immediately with `Closed` on a closed
    /// channel or `Overflow` on a full buffer. The channel stays open and
    /// usable after an overflow.
    pub fn send(&self, message: Message) -> RondoResult<()> {
        {
            let mut mailbox = self.mailbox.lock();
            if !mailbox.open {
                return Err(RondoError::Closed {
                    kind: "channel",
                    id: self.id.to_string(),
                });
            }
            if mailbox.buffer.len() >= self.capacity {
                return Err(RondoError::Overflow {
                    kind: "channel",
                    id: self.id.to_string(),
                });
            }
            mailbox.buffer.push_back(message);
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
        Ok(())
    }

    /// Await the next message. Fails with `Closed` on an already-closed
    /// channel, or `ClosedDuringReceive` when the channel closes while
    /// this call is waiting.
    pub async fn receive(&self) -> RondoResult<Message> {
        let mut waited = false;
        loop {
            // Register for notification before re-checking so a send or
            // close between the check and the await is never lost
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut mailbox = self.mailbox.lock();
                if !mailbox.open {
                    return Err(if waited {
                        RondoError::ClosedDuringReceive {
                            kind: "channel",
                            id: self.id.to_string(),
                        }
                    } else {
                        RondoError::Closed {
                            kind: "channel",
                            id: self.id.to_string(),
                        }
                    });
                }
                if let Some(message) = mailbox.buffer.pop_front() {
                    return Ok(message);
                }
            }
            waited = true;
            notified.await;
        }
    }

    pub fn is_open(&self) -> bool {
        self.mailbox.lock().open
    }

    pub fn len(&self) -> usize {
        self.mailbox.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailbox.lock().buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of messages accepted since creation.
    pub fn message_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}
