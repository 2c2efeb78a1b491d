//! Independently-clocked event loops
//!
//! Event loops run on their own fixed period, decoupled from the 12-step
//! cycle. Each running loop is one spawned task with its own stop channel,
//! so a single loop can be torn down without touching the rest of the
//! orchestra.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use rondo_core::{CoreId, LoopId, RondoResult};

/// Handler fired on each period of an event loop.
pub type LoopHandler = Arc<dyn Fn() -> RondoResult<()> + Send + Sync>;

/// Description of an event loop: identity, owner, period, handler.
#[derive(Clone)]
pub struct EventLoop {
    pub id: LoopId,
    pub core_id: CoreId,
    pub frequency: Duration,
    pub handler: LoopHandler,
}

impl EventLoop {
    pub fn new(
        id: impl Into<LoopId>,
        core_id: impl Into<CoreId>,
        frequency: Duration,
        handler: impl Fn() -> RondoResult<()> + Send + Sync + 'static,
    ) -> Self {
        EventLoop {
            id: id.into(),
            core_id: core_id.into(),
            frequency,
            handler: Arc::new(handler),
        }
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("id", &self.id)
            .field("core_id", &self.core_id)
            .field("frequency", &self.frequency)
            .finish_non_exhaustive()
    }
}

/// Spawn the loop task and hand back its stop channel. The loop fires
/// first after one full period, then on every period; handler failures
/// are logged and never kill the loop.
pub(crate) fn spawn_loop(event_loop: EventLoop) -> mpsc::Sender<()> {
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        let mut ticker = interval_at(
            Instant::now() + event_loop.frequency,
            event_loop.frequency,
        );
        // Delayed ticks are skipped, never replayed in a burst
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = stop_rx.recv() => break,
                _ = ticker.tick() => {
                    if let Err(e) = (event_loop.handler)() {
                        tracing::warn!(
                            loop_id = %event_loop.id,
                            error = %e,
                            "event loop handler failed"
                        );
                    }
                }
            }
        }
        tracing::debug!(loop_id = %event_loop.id, "event loop stopped");
    });

    stop_tx
}
