//! Bridges the interpreted engine's tracing hooks onto the trace bus.
//!
//! The engine exposes three thread-local event streams: message-level
//! events from the executor, per-instruction events from the runtime, and
//! gas accounting from the gasometer. One shared core merges them back
//! into the bus's before-message / step / after-message protocol. A step is
//! assembled in two phases: opened by the runtime `Step` event, charged by
//! the gasometer events that follow, and emitted on `StepResult`.
//!
//! Frames are driven by the executor's `Call`/`Create`/`Exit` events only.
//! `TransactCall`/`TransactCreate` are ignored: the executor emits an inner
//! `Call`/`Create` for the top-level frame as well, and the transact events
//! have no matching `Exit`.
//!
//! Gas is metered per frame. Each frame starts from its own forwarded
//! allowance and tracks the remaining gas reported by gasometer snapshots
//! scoped to its own substate. Snapshots from an enclosing gasometer (the
//! parent's forwarding charge, the remainder credited back before `Exit`)
//! carry a larger gas limit than the frame's allowance and are filtered
//! out, so a frame's consumption is never polluted by its parent's
//! balance.

use std::cell::RefCell;
use std::rc::Rc;

use ethereum_types::{H160, U256};

use crate::exit::{Exit, HaltCode};
use crate::state::{JournalState, MemoryDB};
use crate::tracing::{AccountSummary, MessageResult, TraceBus, TracingMessage, TracingStep};

/// EIP-150 stipend added to a value-bearing call's substate gasometer on
/// top of the forwarded amount.
const CALL_STIPEND: u64 = 2_300;

struct FrameCtx {
    /// The account whose code executes (for creations, the new contract).
    address: H160,
    created: Option<H160>,
    /// The allowance this frame entered with.
    gas_on_entry: u64,
    /// Remaining gas per the frame's own gasometer, `gas_on_entry` until
    /// the substate reports a snapshot.
    gas_left: u64,
    summary: AccountSummary,
}

pub(crate) struct ListenerCore {
    bus: Rc<RefCell<TraceBus>>,
    journal: Rc<RefCell<JournalState<MemoryDB>>>,
    frames: Vec<FrameCtx>,
    pending_step: Option<TracingStep>,
    refunded: i64,
}

impl ListenerCore {
    pub(crate) fn new(
        bus: Rc<RefCell<TraceBus>>,
        journal: Rc<RefCell<JournalState<MemoryDB>>>,
    ) -> Rc<RefCell<ListenerCore>> {
        Rc::new(RefCell::new(ListenerCore {
            bus,
            journal,
            frames: vec![],
            pending_step: None,
            refunded: 0,
        }))
    }

    /// Close any frames the engine abandoned without an `Exit` event (a
    /// nested call that failed before its runtime was spawned). Balances
    /// the bus so every before-message has its after-message.
    pub(crate) fn finish(&mut self, reason: &evm::ExitReason, return_value: &[u8]) {
        while !self.frames.is_empty() {
            self.end_frame(reason, return_value);
        }
    }

    fn summary_of(&self, address: &H160) -> AccountSummary {
        let journal = self.journal.borrow();
        AccountSummary {
            balance: journal.balance(address).unwrap_or_default(),
            nonce: journal.nonce(address).unwrap_or_default(),
            code_hash: journal.code_hash(address).unwrap_or_default(),
        }
    }

    fn code_of(&self, address: &H160) -> Option<Vec<u8>> {
        let code = self.journal.borrow().code(address).unwrap_or_default();
        (!code.is_empty()).then_some(code)
    }

    fn innermost_gas_left(&self) -> u64 {
        self.frames.last().map(|f| f.gas_left).unwrap_or(0)
    }

    #[allow(clippy::too_many_arguments)]
    fn begin_frame(
        &mut self,
        caller: H160,
        to: Option<H160>,
        executing: H160,
        value: U256,
        data: Vec<u8>,
        gas_limit: u64,
        code: Option<Vec<u8>>,
        created: Option<H160>,
    ) {
        let depth = self.frames.len();
        let summary = self.summary_of(&executing);
        self.frames.push(FrameCtx {
            address: executing,
            created,
            gas_on_entry: gas_limit,
            gas_left: gas_limit,
            summary,
        });
        self.bus.borrow_mut().before_message(TracingMessage {
            caller,
            to,
            value,
            data,
            gas_limit,
            depth,
            code,
        });
    }

    fn end_frame(&mut self, reason: &evm::ExitReason, return_value: &[u8]) {
        self.flush_step();
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return,
        };
        let exit = Exit::from_interp_reason(reason).unwrap_or(Exit::Halt(HaltCode::Unknown));
        let created_address = if exit.is_success() { frame.created } else { None };
        self.bus.borrow_mut().after_message(MessageResult {
            exit,
            gas_used: frame.gas_on_entry.saturating_sub(frame.gas_left),
            return_value: return_value.to_vec(),
            created_address,
        });
    }

    fn open_step(&mut self, step: TracingStep) {
        self.flush_step();
        self.pending_step = Some(step);
    }

    fn flush_step(&mut self) {
        if let Some(step) = self.pending_step.take() {
            self.bus.borrow_mut().step(step);
        }
    }

    fn charge(&mut self, cost: u64, snapshot: Option<evm_gasometer::Snapshot>) {
        if let Some(snapshot) = snapshot {
            let remaining = snapshot
                .gas_limit
                .saturating_sub(snapshot.used_gas)
                .saturating_sub(snapshot.memory_gas)
                .saturating_sub(cost);
            if let Some(frame) = self.frames.last_mut() {
                // Only meter readings from this frame's own substate; an
                // enclosing gasometer has a limit beyond the frame's
                // allowance (plus at most the stipend).
                if snapshot.gas_limit <= frame.gas_on_entry.saturating_add(CALL_STIPEND) {
                    frame.gas_left = remaining;
                    self.refunded = snapshot.refunded_gas;
                }
            }
        }
        if let Some(step) = self.pending_step.as_mut() {
            step.gas_cost += cost;
            step.gas_refunded = self.refunded;
            step.gas_left = self
                .frames
                .last()
                .map(|f| f.gas_left)
                .unwrap_or(step.gas_left);
        }
    }

    fn current_frame(&self) -> Option<&FrameCtx> {
        self.frames.last()
    }
}

pub(crate) struct ExecutorListener(pub Rc<RefCell<ListenerCore>>);

impl evm::tracing::EventListener for ExecutorListener {
    fn event(&mut self, event: evm::tracing::Event) {
        use evm::tracing::Event;
        let mut core = self.0.borrow_mut();
        match event {
            Event::Call {
                code_address,
                input,
                target_gas,
                context,
                ..
            } => {
                let gas_limit = target_gas.unwrap_or_else(|| core.innermost_gas_left());
                let code = core.code_of(&code_address);
                core.begin_frame(
                    context.caller,
                    Some(code_address),
                    context.address,
                    context.apparent_value,
                    input.to_vec(),
                    gas_limit,
                    code,
                    None,
                );
            }
            Event::Create {
                caller,
                address,
                value,
                init_code,
                target_gas,
                ..
            } => {
                let gas_limit = target_gas.unwrap_or_else(|| core.innermost_gas_left());
                core.begin_frame(
                    caller,
                    None,
                    address,
                    value,
                    init_code.to_vec(),
                    gas_limit,
                    Some(init_code.to_vec()),
                    Some(address),
                );
            }
            Event::Exit {
                reason,
                return_value,
            } => core.end_frame(reason, return_value),
            _ => {}
        }
    }
}

pub(crate) struct RuntimeListener(pub Rc<RefCell<ListenerCore>>);

impl evm_runtime::tracing::EventListener for RuntimeListener {
    fn event(&mut self, event: evm_runtime::tracing::Event) {
        use evm_runtime::tracing::Event;
        let mut core = self.0.borrow_mut();
        match event {
            Event::Step {
                opcode,
                position,
                stack,
                memory,
                ..
            } => {
                let (depth, gas_left, contract, contract_address) = match core.current_frame() {
                    Some(frame) => (
                        core.frames.len() - 1,
                        frame.gas_left,
                        frame.summary.clone(),
                        frame.address,
                    ),
                    None => return,
                };
                let step = TracingStep {
                    depth,
                    pc: position.as_ref().ok().copied().unwrap_or_default() as u64,
                    opcode: opcode.as_u8(),
                    gas_cost: 0,
                    gas_refunded: core.refunded,
                    gas_left,
                    stack: stack.data().clone(),
                    memory: memory.data().clone(),
                    contract,
                    contract_address,
                };
                core.open_step(step);
            }
            Event::StepResult { .. } => core.flush_step(),
            _ => {}
        }
    }
}

pub(crate) struct GasListener(pub Rc<RefCell<ListenerCore>>);

impl evm_gasometer::tracing::EventListener for GasListener {
    fn event(&mut self, event: evm_gasometer::tracing::Event) {
        use evm_gasometer::tracing::Event;
        let mut core = self.0.borrow_mut();
        match event {
            Event::RecordCost { cost, snapshot } => core.charge(cost, snapshot),
            Event::RecordDynamicCost {
                gas_cost, snapshot, ..
            } => core.charge(gas_cost, snapshot),
            Event::RecordTransaction { cost, snapshot } => core.charge(cost, snapshot),
            Event::RecordStipend { snapshot, .. } | Event::RecordRefund { snapshot, .. } => {
                core.charge(0, snapshot)
            }
        }
    }
}
