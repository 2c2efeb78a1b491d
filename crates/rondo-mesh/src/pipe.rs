//! Bounded stream pipes between cores and the shell

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use rondo_core::{CoreId, PipeId, RondoError, RondoResult, StateValue};

/// Direction of flow relative to the sink.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum PipeDirection {
    Inbound,
    Outbound,
    Bidirectional,
}

impl fmt::Display for PipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipeDirection::Inbound => "inbound",
            PipeDirection::Outbound => "outbound",
            PipeDirection::Bidirectional => "bidirectional",
        };
        f.write_str(name)
    }
}

struct Stream {
    buffer: VecDeque<StateValue>,
    open: bool,
}

/// Bounded stream of dynamic values between a source and a sink. Same
/// contract as `Channel`: fail-fast writes, suspending reads.
pub struct Pipe {
    pub id: PipeId,
    pub name: String,
    pub source: CoreId,
    pub sink: CoreId,
    pub direction: PipeDirection,
    capacity: usize,
    stream: Mutex<Stream>,
    notify: Notify,
    written: AtomicU64,
}

impl Pipe {
    /// Create a pipe. Pipes start closed and must be opened before use.
    pub fn new(
        id: impl Into<PipeId>,
        name: impl Into<String>,
        source: impl Into<CoreId>,
        sink: impl Into<CoreId>,
        direction: PipeDirection,
        capacity: usize,
    ) -> Self {
        Pipe {
            id: id.into(),
            name: name.into(),
            source: source.into(),
            sink: sink.into(),
            direction,
            capacity,
            stream: Mutex::new(Stream {
                buffer: VecDeque::with_capacity(capacity),
                open: false,
            }),
            notify: Notify::new(),
            written: AtomicU64::new(0),
        }
    }

    pub fn open(&self) -> RondoResult<()> {
        let mut stream = self.stream.lock();
        if stream.open {
            return Err(RondoError::AlreadyOpen {
                kind: "pipe",
                id: self.id.to_string(),
            });
        }
        stream.open = true;
        Ok(())
    }

    pub fn close(&self) -> RondoResult<()> {
        {
            let mut stream = self.stream.lock();
            if !stream.open {
                return Err(RondoError::Closed {
                    kind: "pipe",
                    id: self.id.to_string(),
                });
            }
            stream.open = false;
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// Non-blocking write with the same `Closed`/`Overflow` semantics as
    /// `Channel::send`.
    pub fn write(&self, data: StateValue) -> RondoResult<()> {
        {
            let mut stream = self.stream.lock();
            if !stream.open {
                return Err(RondoError::Closed {
                    kind: "pipe",
                    id: self.id.to_string(),
                });
            }
            if stream.buffer.len() >= self.capacity {
                return Err(RondoError::Overflow {
                    kind: "pipe",
                    id: self.id.to_string(),
                });
            }
            stream.buffer.push_back(data);
        }
        self.written.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
        Ok(())
    }

    /// Await the next value; fails once the pipe closes.
    pub async fn read(&self) -> RondoResult<StateValue> {
        let mut waited = false;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut stream = self.stream.lock();
                if !stream.open {
                    return Err(if waited {
                        RondoError::ClosedDuringReceive {
                            kind: "pipe",
                            id: self.id.to_string(),
                        }
                    } else {
                        RondoError::Closed {
                            kind: "pipe",
                            id: self.id.to_string(),
                        }
                    });
                }
                if let Some(data) = stream.buffer.pop_front() {
                    return Ok(data);
                }
            }
            waited = true;
            notified.await;
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.lock().open
    }

    pub fn len(&self) -> usize {
        self.stream.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.lock().buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values accepted since creation.
    pub fn data_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}
