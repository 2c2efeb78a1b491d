//! Local cores - the registered worker units

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use rondo_core::{CoreId, MetricMap, RondoError, RondoResult, StateValue, TelemetryObservation, Timestamp};
use rondo_gestalt::GestaltBroadcast;

use crate::{Channel, ExecutionContext};

/// Bound on a core's retained processing history.
pub const CORE_HISTORY_CAPACITY: usize = 100;

/// Role a core plays in the mesh.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum CoreKind {
    Worker,
    Service,
    Probe,
}

impl fmt::Display for CoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoreKind::Worker => "worker",
            CoreKind::Service => "service",
            CoreKind::Probe => "probe",
        };
        f.write_str(name)
    }
}

/// Collaborator-supplied processing function. Receives the core's current
/// execution context (frame, coordinates, latest gestalt) and the input;
/// any side effects are the collaborator's own business.
pub type ProcessorFn =
    Arc<dyn Fn(&ExecutionContext, StateValue) -> RondoResult<StateValue> + Send + Sync>;

struct CoreInner {
    context: ExecutionContext,
    state: StateValue,
    history: VecDeque<StateValue>,
    processor: Option<ProcessorFn>,
    input_channels: Vec<Arc<Channel>>,
    output_channels: Vec<Arc<Channel>>,
}

/// A worker unit registered with the shell: holds state and a processor,
/// exposes telemetry, and receives gestalt broadcasts.
///
/// All mutable interior state sits behind one lock; updates within a
/// single core are totally ordered by it.
pub struct LocalCore {
    pub id: CoreId,
    pub name: String,
    pub kind: CoreKind,
    inner: RwLock<CoreInner>,
}

impl LocalCore {
    pub fn new(id: impl Into<CoreId>, name: impl Into<String>, kind: CoreKind) -> Self {
        let id = id.into();
        LocalCore {
            inner: RwLock::new(CoreInner {
                context: ExecutionContext::detached(id.clone()),
                state: StateValue::Null,
                history: VecDeque::with_capacity(CORE_HISTORY_CAPACITY),
                processor: None,
                input_channels: Vec::new(),
                output_channels: Vec::new(),
            }),
            id,
            name: name.into(),
            kind,
        }
    }

    pub fn with_processor(
        self,
        processor: impl Fn(&ExecutionContext, StateValue) -> RondoResult<StateValue>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.inner.write().processor = Some(Arc::new(processor));
        self
    }

    pub fn set_processor(
        &self,
        processor: impl Fn(&ExecutionContext, StateValue) -> RondoResult<StateValue>
            + Send
            + Sync
            + 'static,
    ) {
        self.inner.write().processor = Some(Arc::new(processor));
    }

    /// Run the processor on an input: the output becomes the core's
    /// current state and is appended to the bounded history. Processor
    /// errors pass through unmodified; a core without a processor fails
    /// with `NoProcessor`.
    pub fn process(&self, input: StateValue) -> RondoResult<StateValue> {
        let mut inner = self.inner.write();
        let processor = inner
            .processor
            .clone()
            .ok_or_else(|| RondoError::NoProcessor(self.id.clone()))?;

        let output = processor(&inner.context, input)?;

        inner.state = output.clone();
        inner.history.push_back(output.clone());
        while inner.history.len() > CORE_HISTORY_CAPACITY {
            inner.history.pop_front();
        }

        Ok(output)
    }

    /// Sample this core: current state plus the standard metrics.
    pub fn telemetry(&self) -> TelemetryObservation {
        let inner = self.inner.read();

        let mut metrics = MetricMap::new();
        metrics.insert("kind".to_owned(), json!(self.kind.to_string()));
        metrics.insert("history_len".to_owned(), json!(inner.history.len()));
        metrics.insert("input_channels".to_owned(), json!(inner.input_channels.len()));
        metrics.insert(
            "output_channels".to_owned(),
            json!(inner.output_channels.len()),
        );

        TelemetryObservation {
            core_id: self.id.clone(),
            timestamp: Timestamp::now(),
            metrics,
            state: inner.state.clone(),
        }
    }

    /// Accept a gestalt broadcast, replacing the context's snapshot.
    ///
    /// This is the only write path into a core's context from outside the
    /// core; the snapshot is a shared read-only copy.
    pub fn receive_gestalt(&self, broadcast: &GestaltBroadcast) {
        self.inner.write().context.gestalt = Some(Arc::clone(&broadcast.snapshot));
    }

    /// Replace the execution context; called by the shell at registration.
    pub fn set_context(&self, context: ExecutionContext) {
        self.inner.write().context = context;
    }

    pub fn context(&self) -> ExecutionContext {
        self.inner.read().context.clone()
    }

    pub fn state(&self) -> StateValue {
        self.inner.read().state.clone()
    }

    pub fn history_len(&self) -> usize {
        self.inner.read().history.len()
    }

    pub fn attach_input(&self, channel: Arc<Channel>) {
        self.inner.write().input_channels.push(channel);
    }

    pub fn attach_output(&self, channel: Arc<Channel>) {
        self.inner.write().output_channels.push(channel);
    }
}

impl fmt::Debug for LocalCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rondo_gestalt::{GestaltSnapshot, ProcessGraph};

    use super::*;

    #[test]
    fn test_process_without_processor() {
        let core = LocalCore::new("c1", "bare", CoreKind::Worker);
        let err = core.process(json!(1)).unwrap_err();
        assert!(matches!(err, RondoError::NoProcessor(id) if id == CoreId::new("c1")));
    }

    #[test]
    fn test_process_updates_state_and_history() {
        let core = LocalCore::new("c1", "doubler", CoreKind::Worker).with_processor(|_, input| {
            let n = input.as_i64().unwrap_or(0);
            Ok(json!(n * 2))
        });

        assert_eq!(core.process(json!(3)).unwrap(), json!(6));
        assert_eq!(core.process(json!(5)).unwrap(), json!(10));
        assert_eq!(core.state(), json!(10));
        assert_eq!(core.history_len(), 2);
    }

    #[test]
    fn test_processor_error_passes_through() {
        let core = LocalCore::new("c1", "failing", CoreKind::Worker)
            .with_processor(|_, _| Err(RondoError::Processor("bad input".to_owned())));

        let err = core.process(json!(1)).unwrap_err();
        assert!(matches!(err, RondoError::Processor(reason) if reason == "bad input"));
        // Failed runs leave state and history untouched
        assert_eq!(core.state(), StateValue::Null);
        assert_eq!(core.history_len(), 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let core = LocalCore::new("c1", "counter", CoreKind::Worker)
            .with_processor(|_, input| Ok(input));

        for i in 0..(CORE_HISTORY_CAPACITY + 25) {
            core.process(json!(i)).unwrap();
        }
        assert_eq!(core.history_len(), CORE_HISTORY_CAPACITY);
    }

    #[test]
    fn test_receive_gestalt_updates_context() {
        let core = LocalCore::new("c1", "observer", CoreKind::Probe);
        assert!(core.context().gestalt.is_none());

        let broadcast = GestaltBroadcast {
            timestamp: Timestamp::now(),
            snapshot: Arc::new(GestaltSnapshot {
                timestamp: Timestamp::from_millis(42),
                state: HashMap::new(),
                graph: ProcessGraph::new(),
            }),
        };
        core.receive_gestalt(&broadcast);

        let held = core.context().gestalt.unwrap();
        assert_eq!(held.timestamp, Timestamp::from_millis(42));
    }

    #[test]
    fn test_telemetry_reports_standard_metrics() {
        let core = LocalCore::new("c1", "probe", CoreKind::Probe)
            .with_processor(|_, input| Ok(input));
        core.process(json!("busy")).unwrap();
        core.attach_input(Arc::new(Channel::new("in", "in", "x", "c1", 4)));

        let obs = core.telemetry();
        assert_eq!(obs.state, json!("busy"));
        assert_eq!(obs.metrics["kind"], json!("probe"));
        assert_eq!(obs.metrics["history_len"], json!(1));
        assert_eq!(obs.metrics["input_channels"], json!(1));
        assert_eq!(obs.metrics["output_channels"], json!(0));
    }

    #[test]
    fn test_processor_sees_context() {
        let core = LocalCore::new("c1", "ctx", CoreKind::Worker)
            .with_processor(|ctx, _| Ok(json!(ctx.frame.clone())));
        core.set_context(ExecutionContext::new(
            CoreId::new("c1"),
            "core-c1",
            vec![1.0, 0.0],
        ));

        assert_eq!(core.process(json!(null)).unwrap(), json!("core-c1"));
    }
}
