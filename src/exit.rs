use log::warn;

/// Why a frame ended successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessReason {
    Stop,
    Return,
    SelfDestruct,
}

/// Exceptional halt codes, unified across backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltCode {
    OutOfGas,
    InvalidOpcode,
    StackUnderflow,
    StackOverflow,
    InvalidJump,
    OutOfOffset,
    OutOfFunds,
    CallTooDeep,
    CreateCollision,
    CreateContractSizeLimit,
    NonceOverflow,
    StateChangeDuringStaticCall,
    PrecompileFailure,
    /// Backend error symbol with no counterpart in this taxonomy.
    Unknown,
}

/// How a transaction left the EVM. Reverts and halts are normal return
/// paths, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success(SuccessReason),
    /// Recoverable; the return value is user-meaningful (revert data).
    Revert,
    Halt(HaltCode),
}

impl Exit {
    pub fn is_success(&self) -> bool {
        matches!(self, Exit::Success(_))
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    pub fn halt_code(&self) -> Option<HaltCode> {
        match self {
            Exit::Halt(code) => Some(*code),
            _ => None,
        }
    }

    /// Total mapping from the interpreted engine's exit reason. `Fatal`
    /// reasons are infrastructure failures and are rejected here.
    pub fn from_interp_reason(reason: &evm::ExitReason) -> Result<Exit, String> {
        use evm::{ExitError, ExitReason, ExitSucceed};
        match reason {
            ExitReason::Succeed(s) => Ok(Exit::Success(match s {
                ExitSucceed::Stopped => SuccessReason::Stop,
                ExitSucceed::Returned => SuccessReason::Return,
                ExitSucceed::Suicided => SuccessReason::SelfDestruct,
            })),
            ExitReason::Revert(_) => Ok(Exit::Revert),
            ExitReason::Error(e) => Ok(Exit::Halt(match e {
                ExitError::OutOfGas => HaltCode::OutOfGas,
                ExitError::DesignatedInvalid | ExitError::InvalidCode(_) => HaltCode::InvalidOpcode,
                ExitError::StackUnderflow => HaltCode::StackUnderflow,
                ExitError::StackOverflow => HaltCode::StackOverflow,
                ExitError::InvalidJump => HaltCode::InvalidJump,
                ExitError::InvalidRange | ExitError::OutOfOffset | ExitError::PCUnderflow => {
                    HaltCode::OutOfOffset
                }
                ExitError::OutOfFund => HaltCode::OutOfFunds,
                ExitError::CallTooDeep => HaltCode::CallTooDeep,
                ExitError::CreateCollision => HaltCode::CreateCollision,
                ExitError::CreateContractLimit => HaltCode::CreateContractSizeLimit,
                other => {
                    warn!("unmapped interpreted-engine halt: {:?}", other);
                    HaltCode::Unknown
                }
            })),
            ExitReason::Fatal(e) => Err(format!("fatal engine failure: {:?}", e)),
        }
    }

    /// Total mapping from the native engine's execution result.
    pub fn from_native_result(result: &revm::primitives::ExecutionResult) -> Exit {
        use revm::primitives::{ExecutionResult, HaltReason, SuccessReason as NativeReason};
        match result {
            ExecutionResult::Success { reason, .. } => Exit::Success(match reason {
                NativeReason::Stop => SuccessReason::Stop,
                NativeReason::Return => SuccessReason::Return,
                NativeReason::SelfDestruct => SuccessReason::SelfDestruct,
                other => {
                    warn!("unmapped native-engine success reason: {:?}", other);
                    SuccessReason::Return
                }
            }),
            ExecutionResult::Revert { .. } => Exit::Revert,
            ExecutionResult::Halt { reason, .. } => Exit::Halt(match reason {
                HaltReason::OutOfGas(_) => HaltCode::OutOfGas,
                HaltReason::OpcodeNotFound
                | HaltReason::InvalidFEOpcode
                | HaltReason::NotActivated => HaltCode::InvalidOpcode,
                HaltReason::InvalidJump => HaltCode::InvalidJump,
                HaltReason::StackUnderflow => HaltCode::StackUnderflow,
                HaltReason::StackOverflow => HaltCode::StackOverflow,
                HaltReason::OutOfOffset => HaltCode::OutOfOffset,
                HaltReason::OutOfFunds => HaltCode::OutOfFunds,
                HaltReason::CallTooDeep => HaltCode::CallTooDeep,
                HaltReason::CreateCollision | HaltReason::CreateContractStartingWithEF => {
                    HaltCode::CreateCollision
                }
                HaltReason::CreateContractSizeLimit | HaltReason::CreateInitCodeSizeLimit => {
                    HaltCode::CreateContractSizeLimit
                }
                HaltReason::NonceOverflow => HaltCode::NonceOverflow,
                HaltReason::StateChangeDuringStaticCall
                | HaltReason::CallNotAllowedInsideStatic => {
                    HaltCode::StateChangeDuringStaticCall
                }
                HaltReason::PrecompileError => HaltCode::PrecompileFailure,
                other => {
                    warn!("unmapped native-engine halt: {:?}", other);
                    HaltCode::Unknown
                }
            }),
        }
    }
}
