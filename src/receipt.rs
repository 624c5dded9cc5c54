use ethereum_types::{Bloom, BloomInput, H160, H256, U256};

/// One EVM log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: H160,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

impl rlp::Encodable for Log {
    fn rlp_append(&self, s: &mut rlp::RlpStream) {
        s.begin_list(3);
        s.append(&self.address);
        s.append_list(&self.topics);
        s.append(&self.data);
    }
}

/// 2048-bit filter over the log addresses and topics.
pub fn bloom_for_logs(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::zero();
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_bytes()));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Raw(topic.as_bytes()));
        }
    }
    bloom
}

/// Pre-Byzantium receipts commit to a state root; later ones to a status
/// byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptOutcome {
    StateRoot(H256),
    Status(u8),
}

/// Per-transaction record, bit-compatible with the canonical encoding
/// `rlp([status-or-stateRoot, cumulativeGasUsed, logsBloom, logs])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub outcome: ReceiptOutcome,
    pub cumulative_gas_used: U256,
    pub bloom: Bloom,
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn new(outcome: ReceiptOutcome, cumulative_gas_used: U256, logs: Vec<Log>) -> Receipt {
        Receipt {
            outcome,
            cumulative_gas_used,
            bloom: bloom_for_logs(&logs),
            logs,
        }
    }

    pub fn rlp_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }
}

impl rlp::Encodable for Receipt {
    fn rlp_append(&self, s: &mut rlp::RlpStream) {
        s.begin_list(4);
        match &self.outcome {
            ReceiptOutcome::StateRoot(root) => s.append(root),
            ReceiptOutcome::Status(status) => s.append(status),
        };
        s.append(&self.cumulative_gas_used);
        s.append(&self.bloom);
        s.append_list(&self.logs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> Log {
        Log {
            address: H160::repeat_byte(0x42),
            topics: vec![H256::repeat_byte(0x01), H256::repeat_byte(0x02)],
            data: vec![0xde, 0xad],
        }
    }

    #[test]
    fn bloom_covers_address_and_topics() {
        let log = sample_log();
        let bloom = bloom_for_logs(std::slice::from_ref(&log));
        assert!(bloom.contains_input(BloomInput::Raw(log.address.as_bytes())));
        assert!(bloom.contains_input(BloomInput::Raw(log.topics[0].as_bytes())));
        assert!(!bloom.contains_input(BloomInput::Raw(H256::repeat_byte(0x77).as_bytes())));
    }

    #[test]
    fn receipt_encodes_as_canonical_four_item_list() {
        let receipt = Receipt::new(ReceiptOutcome::Status(1), U256::from(21000), vec![]);
        let encoded = receipt.rlp_bytes();
        let decoded = rlp::Rlp::new(&encoded);
        assert!(decoded.is_list());
        assert_eq!(decoded.item_count().unwrap(), 4);
        assert_eq!(decoded.val_at::<u8>(0).unwrap(), 1);
        assert_eq!(decoded.val_at::<U256>(1).unwrap(), U256::from(21000));
        assert_eq!(decoded.at(3).unwrap().item_count().unwrap(), 0);
    }

    #[test]
    fn receipt_with_log_round_trips_fields() {
        let receipt = Receipt::new(
            ReceiptOutcome::Status(0),
            U256::from(53000),
            vec![sample_log()],
        );
        let encoded = receipt.rlp_bytes();
        let decoded = rlp::Rlp::new(&encoded);
        let logs = decoded.at(3).unwrap();
        assert_eq!(logs.item_count().unwrap(), 1);
        let first = logs.at(0).unwrap();
        assert_eq!(first.val_at::<H160>(0).unwrap(), H160::repeat_byte(0x42));
        assert_eq!(
            first.at(1).unwrap().item_count().unwrap(),
            2,
            "two topics expected"
        );
    }
}
