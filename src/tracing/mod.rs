mod bus;
mod opcodes;
mod tracer;

pub use bus::{DynTracer, LastTrace, TraceBus, TracerError};
pub use opcodes::opcode_name;
pub use tracer::MessageTracer;

use ethereum_types::{H160, H256, U256};

use crate::exit::Exit;

/// Snapshot of the executing contract's account at frame entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSummary {
    pub balance: U256,
    pub nonce: U256,
    pub code_hash: H256,
}

/// A call frame entering execution. `to: None` denotes contract creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingMessage {
    pub caller: H160,
    pub to: Option<H160>,
    pub value: U256,
    pub data: Vec<u8>,
    pub gas_limit: u64,
    pub depth: usize,
    pub code: Option<Vec<u8>>,
}

/// One executed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingStep {
    pub depth: usize,
    pub pc: u64,
    pub opcode: u8,
    pub gas_cost: u64,
    pub gas_refunded: i64,
    pub gas_left: u64,
    pub stack: Vec<H256>,
    pub memory: Vec<u8>,
    pub contract: AccountSummary,
    pub contract_address: H160,
}

impl TracingStep {
    pub fn opcode_name(&self) -> &'static str {
        opcode_name(self.opcode)
    }
}

/// Outcome of a finished call frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageResult {
    pub exit: Exit,
    pub gas_used: u64,
    pub return_value: Vec<u8>,
    pub created_address: Option<H160>,
}

/// Entries of a frame in issuance order: executed steps interleaved with
/// nested frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceItem {
    Step(TracingStep),
    Message(Box<MessageTrace>),
}

/// Reconstructed call-frame tree for one top-level message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTrace {
    pub message: TracingMessage,
    pub items: Vec<TraceItem>,
    pub result: Option<MessageResult>,
}

impl MessageTrace {
    pub fn new(message: TracingMessage) -> MessageTrace {
        MessageTrace {
            message,
            items: vec![],
            result: None,
        }
    }

    /// The frame's own steps, excluding nested frames.
    pub fn steps(&self) -> impl Iterator<Item = &TracingStep> {
        self.items.iter().filter_map(|item| match item {
            TraceItem::Step(step) => Some(step),
            TraceItem::Message(_) => None,
        })
    }

    /// Nested call frames, in issuance order.
    pub fn children(&self) -> impl Iterator<Item = &MessageTrace> {
        self.items.iter().filter_map(|item| match item {
            TraceItem::Message(child) => Some(child.as_ref()),
            TraceItem::Step(_) => None,
        })
    }

    pub fn return_value(&self) -> &[u8] {
        self.result
            .as_ref()
            .map(|r| r.return_value.as_slice())
            .unwrap_or(&[])
    }
}
