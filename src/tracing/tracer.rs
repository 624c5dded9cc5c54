use super::bus::TracerError;
use super::{MessageResult, MessageTrace, TraceItem, TracingMessage, TracingStep};

/// The always-on structural tracer: rebuilds the call-frame tree from the
/// bus event stream by pushing on before-message, appending steps, and
/// popping on after-message.
#[derive(Default)]
pub struct MessageTracer {
    stack: Vec<MessageTrace>,
    last_top_level: Option<MessageTrace>,
}

impl MessageTracer {
    pub fn new() -> MessageTracer {
        MessageTracer::default()
    }

    pub fn begin_message(&mut self, message: TracingMessage) {
        self.stack.push(MessageTrace::new(message));
    }

    pub fn add_step(&mut self, step: TracingStep) -> Result<(), TracerError> {
        match self.stack.last_mut() {
            Some(frame) => {
                frame.items.push(TraceItem::Step(step));
                Ok(())
            }
            None => Err(TracerError::new("step event outside of any message")),
        }
    }

    pub fn finish_message(&mut self, result: MessageResult) -> Result<(), TracerError> {
        let mut frame = self
            .stack
            .pop()
            .ok_or_else(|| TracerError::new("after-message event without matching before"))?;
        frame.result = Some(result);
        match self.stack.last_mut() {
            Some(parent) => parent.items.push(TraceItem::Message(Box::new(frame))),
            None => self.last_top_level = Some(frame),
        }
        Ok(())
    }

    /// The most recently completed top-level frame.
    pub fn last_top_level_trace(&self) -> Option<&MessageTrace> {
        self.last_top_level.as_ref()
    }

    /// Frames opened but not yet closed. Zero outside of execution.
    pub fn open_frames(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::{Exit, SuccessReason};
    use ethereum_types::{H160, U256};

    fn message(depth: usize) -> TracingMessage {
        TracingMessage {
            caller: H160::repeat_byte(0x01),
            to: Some(H160::repeat_byte(0x02)),
            value: U256::zero(),
            data: vec![],
            gas_limit: 100_000,
            depth,
            code: None,
        }
    }

    fn result() -> MessageResult {
        MessageResult {
            exit: Exit::Success(SuccessReason::Stop),
            gas_used: 21_000,
            return_value: vec![],
            created_address: None,
        }
    }

    #[test]
    fn nested_frames_attach_to_parent() {
        let mut tracer = MessageTracer::new();
        tracer.begin_message(message(0));
        tracer.begin_message(message(1));
        tracer.finish_message(result()).unwrap();
        tracer.finish_message(result()).unwrap();

        let top = tracer.last_top_level_trace().unwrap();
        assert_eq!(top.message.depth, 0);
        assert_eq!(top.children().count(), 1);
        assert_eq!(tracer.open_frames(), 0);
    }

    #[test]
    fn unmatched_after_message_is_an_error() {
        let mut tracer = MessageTracer::new();
        assert!(tracer.finish_message(result()).is_err());
    }

    #[test]
    fn top_level_trace_survives_next_begin() {
        let mut tracer = MessageTracer::new();
        tracer.begin_message(message(0));
        tracer.finish_message(result()).unwrap();
        assert!(tracer.last_top_level_trace().is_some());
        tracer.begin_message(message(0));
        // The previous completed trace is still reachable mid-message.
        assert!(tracer.last_top_level_trace().is_some());
    }
}
