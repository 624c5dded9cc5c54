//! Block assembly, reversion, rewards, snapshots and time-travel.

mod util;

use devnode_vm::{Error, Hardfork};
use ethereum_types::{H256, U256};
use util::*;

const FORK: Hardfork = Hardfork::Shanghai;

#[test]
fn reverted_block_restores_balances_and_root() {
    let a = addr(0x0a);
    let b = addr(0x0b);
    let c = addr(0x0c);
    let block = block_at(FORK, 30_000_000);

    for (name, mut vm) in both_backends(FORK, funded_genesis(&[(a, ether(100))])) {
        let root_before = vm.state_root().unwrap();

        vm.start_block().unwrap();
        vm.run_tx_in_block(&transfer_tx(a, b, ether(1), 0, 0), &block)
            .unwrap();
        vm.run_tx_in_block(&transfer_tx(a, c, ether(2), 1, 0), &block)
            .unwrap();
        vm.revert_block().unwrap();

        assert_eq!(vm.state_root().unwrap(), root_before, "{}", name);
        let account = vm.account(&a).unwrap().unwrap();
        assert_eq!(account.balance, ether(100), "{}", name);
        assert_eq!(account.nonce, U256::zero(), "{}", name);
        assert!(vm.account(&b).unwrap().is_none(), "{}", name);
        assert!(vm.account(&c).unwrap().is_none(), "{}", name);
    }
}

#[test]
fn sealed_block_commits_transfers_and_nonces() {
    let a = addr(0x0a);
    let b = addr(0x0b);
    let block = block_at(FORK, 30_000_000);

    for (name, mut vm) in both_backends(FORK, funded_genesis(&[(a, ether(100))])) {
        let root_before = vm.state_root().unwrap();

        vm.start_block().unwrap();
        let first = vm
            .run_tx_in_block(&transfer_tx(a, b, ether(1), 0, 0), &block)
            .unwrap();
        let second = vm
            .run_tx_in_block(&transfer_tx(a, b, ether(2), 1, 0), &block)
            .unwrap();
        vm.seal_block().unwrap();

        // Gas accumulates monotonically across the block's receipts.
        assert_eq!(first.receipt.cumulative_gas_used, U256::from(21_000), "{}", name);
        assert_eq!(second.receipt.cumulative_gas_used, U256::from(42_000), "{}", name);

        assert_ne!(vm.state_root().unwrap(), root_before, "{}", name);
        assert_eq!(vm.account(&b).unwrap().unwrap().balance, ether(3), "{}", name);
        let sender = vm.account(&a).unwrap().unwrap();
        assert_eq!(sender.nonce, U256::from(2), "{}", name);
        assert_eq!(sender.balance, ether(97), "{}", name);
    }
}

#[test]
fn fee_settlement_matches_across_backends() {
    let a = addr(0x0a);
    let b = addr(0x0b);
    let mut block = block_at(Hardfork::London, 30_000_000);
    block.base_fee = Some(U256::from(3));

    let mut observed = vec![];
    for (name, mut vm) in both_backends(Hardfork::London, funded_genesis(&[(a, ether(100))])) {
        vm.start_block().unwrap();
        let result = vm
            .run_tx_in_block(&transfer_tx(a, b, ether(1), 0, 7), &block)
            .unwrap();
        vm.seal_block().unwrap();
        assert!(result.exit.is_success(), "{}", name);

        let sender = vm.account(&a).unwrap().unwrap().balance;
        let receiver = vm.account(&b).unwrap().unwrap().balance;
        let coinbase = vm.account(&block.coinbase).unwrap().unwrap().balance;

        // Sender pays the effective price; the coinbase keeps the priority
        // fee; the basefee portion is burned.
        assert_eq!(sender, ether(99) - U256::from(21_000u64 * 7), "{}", name);
        assert_eq!(receiver, ether(1), "{}", name);
        assert_eq!(coinbase, U256::from(21_000u64 * 4), "{}", name);
        observed.push((sender, receiver, coinbase));
    }
    assert_eq!(observed[0], observed[1], "backends disagree");
}

#[test]
fn block_rewards_credit_fresh_accounts() {
    let miner = addr(0xee);
    for (name, mut vm) in both_backends(FORK, vec![]) {
        vm.start_block().unwrap();
        vm.add_block_rewards(&[(miner, ether(2))]).unwrap();
        vm.seal_block().unwrap();
        assert_eq!(
            vm.account(&miner).unwrap().unwrap().balance,
            ether(2),
            "{}",
            name
        );
    }
}

#[test]
fn rewards_are_discarded_with_the_block() {
    let miner = addr(0xee);
    for (name, mut vm) in both_backends(FORK, vec![]) {
        vm.start_block().unwrap();
        vm.add_block_rewards(&[(miner, ether(2))]).unwrap();
        vm.revert_block().unwrap();
        assert!(vm.account(&miner).unwrap().is_none(), "{}", name);
    }
}

#[test]
fn lifecycle_violations_are_rejected() {
    let block = block_at(FORK, 30_000_000);
    let tx = transfer_tx(addr(0x0a), addr(0x0b), U256::zero(), 0, 0);

    for (name, mut vm) in both_backends(FORK, funded_genesis(&[(addr(0x0a), ether(1))])) {
        assert!(
            matches!(vm.run_tx_in_block(&tx, &block), Err(Error::BlockLifecycle(_))),
            "{}",
            name
        );
        assert!(
            matches!(vm.seal_block(), Err(Error::BlockLifecycle(_))),
            "{}",
            name
        );
        assert!(
            matches!(vm.revert_block(), Err(Error::BlockLifecycle(_))),
            "{}",
            name
        );
        assert!(
            matches!(vm.add_block_rewards(&[]), Err(Error::BlockLifecycle(_))),
            "{}",
            name
        );

        vm.start_block().unwrap();
        assert!(
            matches!(vm.start_block(), Err(Error::BlockLifecycle(_))),
            "{}",
            name
        );
        vm.revert_block().unwrap();
    }
}

#[test]
fn snapshot_and_restore_round_trip() {
    let a = addr(0x0a);
    for (name, mut vm) in both_backends(FORK, funded_genesis(&[(a, ether(5))])) {
        let snapshot = vm.make_snapshot().unwrap();
        let root_at_snapshot = vm.state_root().unwrap();

        vm.put_account(&a, ether(1), U256::from(9)).unwrap();
        vm.put_contract_storage(&addr(0x33), H256::from_low_u64_be(1), H256::from_low_u64_be(2))
            .unwrap();
        assert_ne!(vm.state_root().unwrap(), root_at_snapshot, "{}", name);

        vm.restore_context(&snapshot, None).unwrap();
        assert_eq!(vm.state_root().unwrap(), root_at_snapshot, "{}", name);
        let account = vm.account(&a).unwrap().unwrap();
        assert_eq!(account.balance, ether(5), "{}", name);
        assert_eq!(account.nonce, U256::zero(), "{}", name);
    }
}

#[test]
fn unknown_state_root_is_rejected() {
    for (name, mut vm) in both_backends(FORK, vec![]) {
        let missing = H256::repeat_byte(0x99);
        assert!(
            matches!(vm.set_state_root(&missing), Err(Error::UnknownStateRoot(root)) if root == missing),
            "{}",
            name
        );
    }
}

#[test]
fn dry_run_does_not_disturb_an_open_block() {
    let a = addr(0x0a);
    let b = addr(0x0b);
    let block = block_at(FORK, 30_000_000);

    for (name, mut vm) in both_backends(FORK, funded_genesis(&[(a, ether(10))])) {
        vm.start_block().unwrap();
        vm.run_tx_in_block(&transfer_tx(a, b, ether(1), 0, 0), &block)
            .unwrap();

        // A dry run between block transactions must not leak state.
        let probe = vm
            .dry_run(&transfer_tx(a, b, ether(5), 7, 0), &block, false)
            .unwrap();
        assert!(probe.exit.is_success(), "{}", name);

        vm.run_tx_in_block(&transfer_tx(a, b, ether(2), 1, 0), &block)
            .unwrap();
        vm.seal_block().unwrap();

        assert_eq!(vm.account(&b).unwrap().unwrap().balance, ether(3), "{}", name);
        assert_eq!(vm.account(&a).unwrap().unwrap().nonce, U256::from(2), "{}", name);
    }
}

#[test]
fn committed_storage_survives_the_block() {
    let a = addr(0x0a);
    let store = addr(0x44);
    let block = block_at(FORK, 30_000_000);

    for (name, mut vm) in both_backends(FORK, funded_genesis(&[(a, ether(1))])) {
        vm.put_contract_code(&store, store_42()).unwrap();
        vm.start_block().unwrap();
        let result = vm
            .run_tx_in_block(&call_tx(a, store, 100_000, 0), &block)
            .unwrap();
        assert!(result.exit.is_success(), "{}", name);
        vm.seal_block().unwrap();

        assert_eq!(
            vm.contract_storage(&store, &H256::zero()).unwrap(),
            H256::from_low_u64_be(0x2a),
            "{}",
            name
        );
        assert_eq!(vm.contract_code(&store).unwrap(), store_42(), "{}", name);
    }
}

#[test]
fn wrong_nonce_is_rejected_in_blocks() {
    let a = addr(0x0a);
    let block = block_at(FORK, 30_000_000);
    for (name, mut vm) in both_backends(FORK, funded_genesis(&[(a, ether(1))])) {
        vm.start_block().unwrap();
        let result = vm.run_tx_in_block(&transfer_tx(a, addr(0x0b), U256::zero(), 5, 0), &block);
        assert!(
            matches!(result, Err(Error::InvalidNonce { .. })),
            "{}",
            name
        );
        vm.revert_block().unwrap();
    }
}

#[test]
fn warm_addresses_reflect_block_activity_on_the_interpreted_backend() {
    let a = addr(0x0a);
    let b = addr(0x0b);
    let block = block_at(FORK, 30_000_000);

    let mut vm = adapter_with(
        devnode_vm::BackendKind::Interpreted,
        FORK,
        funded_genesis(&[(a, ether(1))]),
    );
    vm.start_block().unwrap();
    assert!(!vm.is_warmed_address(&a));
    vm.run_tx_in_block(&transfer_tx(a, b, U256::zero(), 0, 0), &block)
        .unwrap();
    assert!(vm.is_warmed_address(&a));
    assert!(vm.is_warmed_address(&b));
    assert!(!vm.is_warmed_address(&addr(0x77)));
    vm.seal_block().unwrap();

    // The native backend only answers conservatively.
    let native = adapter_with(devnode_vm::BackendKind::Native, FORK, vec![]);
    assert!(native.is_warmed_address(&addr(0x77)));
}

#[test]
fn hardfork_queries_delegate_to_the_selector() {
    for (name, vm) in both_backends(FORK, vec![]) {
        assert_eq!(vm.select_hardfork(0), FORK, "{}", name);
        assert!(vm.gte_hardfork(Hardfork::Merge), "{}", name);
        assert!(vm.gte_hardfork(FORK), "{}", name);
        let spec = vm.chain_spec();
        assert_eq!(spec.chain_id, CHAIN_ID, "{}", name);
        assert_eq!(spec.hardfork, FORK, "{}", name);
    }
}
