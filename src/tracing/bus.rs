use log::warn;

use super::tracer::MessageTracer;
use super::{MessageResult, MessageTrace, TracingMessage, TracingStep};

/// Failure raised by a trace subscriber. Captured by the bus and surfaced
/// through `last_trace`; never thrown into the VM stepper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tracer failure: {0}")]
pub struct TracerError(String);

impl TracerError {
    pub fn new(message: impl Into<String>) -> TracerError {
        TracerError(message.into())
    }
}

/// The optional debug tracer attached via the adapter. Each callback runs
/// synchronously with the stepper; returning `Err` records the failure on
/// the bus without interrupting delivery of subsequent events.
pub trait DynTracer {
    fn before_message(&mut self, message: &TracingMessage) -> Result<(), TracerError>;

    fn step(&mut self, step: &TracingStep) -> Result<(), TracerError>;

    fn after_message(&mut self, result: &MessageResult) -> Result<(), TracerError>;
}

/// Most recent top-level trace and any captured subscriber error.
#[derive(Debug, Clone, Default)]
pub struct LastTrace {
    pub trace: Option<MessageTrace>,
    pub error: Option<TracerError>,
}

/// Synchronous fan-out of trace events. The structural tracer is always
/// subscribed; a debug tracer may be attached, at most one at a time.
/// Events are delivered in issuance order, structural tracer first.
#[derive(Default)]
pub struct TraceBus {
    structural: MessageTracer,
    debug: Option<Box<dyn DynTracer>>,
    last_error: Option<TracerError>,
}

impl TraceBus {
    pub fn new() -> TraceBus {
        TraceBus::default()
    }

    /// Attach the debug tracer, replacing any previous one.
    pub fn set_debug_tracer(&mut self, tracer: Box<dyn DynTracer>) {
        self.debug = Some(tracer);
    }

    /// Detach the debug tracer. Returns whether one was attached.
    pub fn remove_debug_tracer(&mut self) -> bool {
        self.debug.take().is_some()
    }

    pub fn before_message(&mut self, message: TracingMessage) {
        if let Some(debug) = self.debug.as_mut() {
            if let Err(e) = debug.before_message(&message) {
                Self::record(&mut self.last_error, e);
            }
        }
        self.structural.begin_message(message);
    }

    pub fn step(&mut self, step: TracingStep) {
        if let Some(debug) = self.debug.as_mut() {
            if let Err(e) = debug.step(&step) {
                Self::record(&mut self.last_error, e);
            }
        }
        if let Err(e) = self.structural.add_step(step) {
            Self::record(&mut self.last_error, e);
        }
    }

    pub fn after_message(&mut self, result: MessageResult) {
        if let Some(debug) = self.debug.as_mut() {
            if let Err(e) = debug.after_message(&result) {
                Self::record(&mut self.last_error, e);
            }
        }
        if let Err(e) = self.structural.finish_message(result) {
            Self::record(&mut self.last_error, e);
        }
    }

    pub fn last_trace(&self) -> LastTrace {
        LastTrace {
            trace: self.structural.last_top_level_trace().cloned(),
            error: self.last_error.clone(),
        }
    }

    pub fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    fn record(slot: &mut Option<TracerError>, error: TracerError) {
        warn!("trace subscriber failed: {}", error);
        if slot.is_none() {
            *slot = Some(error);
        }
    }
}
