//! Shared fixtures: adapter construction and hand-assembled bytecode.
#![allow(dead_code)]

use std::sync::Arc;

use devnode_vm::{
    create, fixed_selector, BackendKind, BlockContext, BlockHashProviderMock, GenesisAccount,
    Hardfork, LegacyTx, TypedTransaction, VmAdapter, VmConfig,
};
use ethereum_types::{H160, H256, U256};

pub const CHAIN_ID: u64 = 31337;

pub fn addr(byte: u8) -> H160 {
    H160::repeat_byte(byte)
}

pub fn ether(n: u64) -> U256 {
    U256::exp10(18) * U256::from(n)
}

pub fn adapter_with(
    backend: BackendKind,
    fork: Hardfork,
    genesis: Vec<GenesisAccount>,
) -> Box<dyn VmAdapter> {
    let mut config = VmConfig::new(backend, CHAIN_ID, fork);
    config.genesis = genesis;
    create(
        config,
        Arc::new(BlockHashProviderMock::default()),
        fixed_selector(fork),
    )
    .unwrap()
}

/// Both backends over identical genesis, for cross-backend assertions.
pub fn both_backends(
    fork: Hardfork,
    genesis: Vec<GenesisAccount>,
) -> Vec<(&'static str, Box<dyn VmAdapter>)> {
    vec![
        (
            "interpreted",
            adapter_with(BackendKind::Interpreted, fork, genesis.clone()),
        ),
        ("native", adapter_with(BackendKind::Native, fork, genesis)),
    ]
}

pub fn funded_genesis(accounts: &[(H160, U256)]) -> Vec<GenesisAccount> {
    accounts
        .iter()
        .map(|(address, balance)| GenesisAccount::with_balance(*address, *balance))
        .collect()
}

pub fn block_at(fork: Hardfork, gas_limit: u64) -> BlockContext {
    BlockContext {
        number: U256::one(),
        coinbase: addr(0xc0),
        timestamp: U256::from(1_000),
        base_fee: fork.has_base_fee().then(U256::zero),
        gas_limit: U256::from(gas_limit),
        difficulty: if fork.is_post_merge() {
            U256::zero()
        } else {
            U256::one()
        },
        mix_hash: fork.is_post_merge().then(|| H256::repeat_byte(0x11)),
        state_root: H256::zero(),
        parent_hash: H256::zero(),
    }
}

pub fn transfer_tx(
    from: H160,
    to: H160,
    value: U256,
    nonce: u64,
    gas_price: u64,
) -> TypedTransaction {
    TypedTransaction::Legacy(LegacyTx {
        from,
        to: Some(to),
        nonce: U256::from(nonce),
        gas_limit: 21_000,
        gas_price: U256::from(gas_price),
        value,
        input: vec![],
    })
}

pub fn call_tx(from: H160, to: H160, gas_limit: u64, nonce: u64) -> TypedTransaction {
    TypedTransaction::Legacy(LegacyTx {
        from,
        to: Some(to),
        nonce: U256::from(nonce),
        gas_limit,
        gas_price: U256::zero(),
        value: U256::zero(),
        input: vec![],
    })
}

pub fn create_tx(from: H160, init_code: Vec<u8>, gas_limit: u64, nonce: u64) -> TypedTransaction {
    TypedTransaction::Legacy(LegacyTx {
        from,
        to: None,
        nonce: U256::from(nonce),
        gas_limit,
        gas_price: U256::zero(),
        value: U256::zero(),
        input: init_code,
    })
}

// --- bytecode assembly -------------------------------------------------

pub const OP_STOP: u8 = 0x00;
pub const OP_MSTORE: u8 = 0x52;
pub const OP_SSTORE: u8 = 0x55;
pub const OP_JUMP: u8 = 0x56;
pub const OP_JUMPDEST: u8 = 0x5b;
pub const OP_PREVRANDAO: u8 = 0x44;
pub const OP_BASEFEE: u8 = 0x48;
pub const OP_LOG1: u8 = 0xa1;
pub const OP_CALL: u8 = 0xf1;
pub const OP_RETURN: u8 = 0xf3;
pub const OP_REVERT: u8 = 0xfd;

/// PUSHn for a 1..=32 byte immediate.
pub fn push(code: &mut Vec<u8>, bytes: &[u8]) {
    assert!(!bytes.is_empty() && bytes.len() <= 32);
    code.push(0x60 + (bytes.len() - 1) as u8);
    code.extend_from_slice(bytes);
}

/// Store `data` into memory starting at offset 0, 32-byte word at a time.
fn mstore_blob(code: &mut Vec<u8>, data: &[u8]) {
    for (i, chunk) in data.chunks(32).enumerate() {
        let mut word = [0u8; 32];
        word[..chunk.len()].copy_from_slice(chunk);
        push(code, &word);
        push(code, &[(i * 32) as u8]);
        code.push(OP_MSTORE);
    }
}

/// Runtime code that reverts with exactly `data`.
pub fn revert_with(data: &[u8]) -> Vec<u8> {
    let mut code = vec![];
    mstore_blob(&mut code, data);
    push(&mut code, &[data.len() as u8]);
    push(&mut code, &[0]);
    code.push(OP_REVERT);
    code
}

/// Runtime code that returns exactly `data`.
pub fn return_with(data: &[u8]) -> Vec<u8> {
    let mut code = vec![];
    mstore_blob(&mut code, data);
    push(&mut code, &[data.len() as u8]);
    push(&mut code, &[0]);
    code.push(OP_RETURN);
    code
}

/// Init code that deploys `runtime` via CODECOPY.
pub fn deploy_code(runtime: &[u8]) -> Vec<u8> {
    assert!(runtime.len() < 256);
    let len = runtime.len() as u8;
    // PUSH1 len, PUSH1 offset, PUSH1 0, CODECOPY, PUSH1 len, PUSH1 0, RETURN
    let mut init = vec![
        0x60, len, 0x60, 0x0c, 0x60, 0x00, 0x39, 0x60, len, 0x60, 0x00, 0xf3,
    ];
    init.extend_from_slice(runtime);
    init
}

/// JUMPDEST; PUSH1 0; JUMP — spins until out of gas.
pub fn infinite_loop() -> Vec<u8> {
    vec![OP_JUMPDEST, 0x60, 0x00, OP_JUMP]
}

/// Returns the 32-byte word an environment opcode pushes.
pub fn return_env_word(opcode: u8) -> Vec<u8> {
    vec![
        opcode, 0x60, 0x00, OP_MSTORE, 0x60, 0x20, 0x60, 0x00, OP_RETURN,
    ]
}

/// PUSH1 0x2a; PUSH1 0; SSTORE; STOP.
pub fn store_42() -> Vec<u8> {
    vec![0x60, 0x2a, 0x60, 0x00, OP_SSTORE, OP_STOP]
}

/// Emits LOG1 with the given topic byte and no data, then stops.
pub fn emit_log(topic_byte: u8) -> Vec<u8> {
    vec![
        0x60, topic_byte, 0x60, 0x00, 0x60, 0x00, OP_LOG1, OP_STOP,
    ]
}

/// Calls `target` with no data forwarding 0xffff gas, then stops.
pub fn call_then_stop(target: H160) -> Vec<u8> {
    let mut code = vec![];
    push(&mut code, &[0]); // ret length
    push(&mut code, &[0]); // ret offset
    push(&mut code, &[0]); // arg length
    push(&mut code, &[0]); // arg offset
    push(&mut code, &[0]); // value
    push(&mut code, target.as_bytes()); // address
    push(&mut code, &[0xff, 0xff]); // gas
    code.push(OP_CALL);
    code.push(OP_STOP);
    code
}

/// ABI encoding of `Error("nope")`.
pub fn abi_error_nope() -> Vec<u8> {
    let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
    data.extend_from_slice(H256::from_low_u64_be(0x20).as_bytes());
    data.extend_from_slice(H256::from_low_u64_be(4).as_bytes());
    let mut message = [0u8; 32];
    message[..4].copy_from_slice(b"nope");
    data.extend_from_slice(&message);
    data
}
