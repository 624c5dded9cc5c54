use ethereum_types::{H160, H256, U256};

/// EIP-2930 access list: addresses and storage keys warmed up front.
pub type AccessList = Vec<(H160, Vec<H256>)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyTx {
    pub from: H160,
    pub to: Option<H160>,
    pub nonce: U256,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub value: U256,
    pub input: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eip2930Tx {
    pub from: H160,
    pub to: Option<H160>,
    pub nonce: U256,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub value: U256,
    pub input: Vec<u8>,
    pub chain_id: u64,
    pub access_list: AccessList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eip1559Tx {
    pub from: H160,
    pub to: Option<H160>,
    pub nonce: U256,
    pub gas_limit: u64,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub value: U256,
    pub input: Vec<u8>,
    pub chain_id: u64,
    pub access_list: AccessList,
}

/// Transaction envelope as handed to the adapter. The sender is explicit:
/// signature recovery happened upstream in the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedTransaction {
    Legacy(LegacyTx),
    Eip2930(Eip2930Tx),
    Eip1559(Eip1559Tx),
}

impl TypedTransaction {
    pub fn from(&self) -> H160 {
        match self {
            TypedTransaction::Legacy(tx) => tx.from,
            TypedTransaction::Eip2930(tx) => tx.from,
            TypedTransaction::Eip1559(tx) => tx.from,
        }
    }

    /// `None` denotes contract creation.
    pub fn to(&self) -> Option<H160> {
        match self {
            TypedTransaction::Legacy(tx) => tx.to,
            TypedTransaction::Eip2930(tx) => tx.to,
            TypedTransaction::Eip1559(tx) => tx.to,
        }
    }

    pub fn nonce(&self) -> U256 {
        match self {
            TypedTransaction::Legacy(tx) => tx.nonce,
            TypedTransaction::Eip2930(tx) => tx.nonce,
            TypedTransaction::Eip1559(tx) => tx.nonce,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            TypedTransaction::Legacy(tx) => tx.gas_limit,
            TypedTransaction::Eip2930(tx) => tx.gas_limit,
            TypedTransaction::Eip1559(tx) => tx.gas_limit,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            TypedTransaction::Legacy(tx) => tx.value,
            TypedTransaction::Eip2930(tx) => tx.value,
            TypedTransaction::Eip1559(tx) => tx.value,
        }
    }

    pub fn input(&self) -> &[u8] {
        match self {
            TypedTransaction::Legacy(tx) => &tx.input,
            TypedTransaction::Eip2930(tx) => &tx.input,
            TypedTransaction::Eip1559(tx) => &tx.input,
        }
    }

    pub fn access_list(&self) -> &[(H160, Vec<H256>)] {
        match self {
            TypedTransaction::Legacy(_) => &[],
            TypedTransaction::Eip2930(tx) => &tx.access_list,
            TypedTransaction::Eip1559(tx) => &tx.access_list,
        }
    }

    /// The price actually paid per unit of gas under `base_fee`.
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> U256 {
        match self {
            TypedTransaction::Legacy(tx) => tx.gas_price,
            TypedTransaction::Eip2930(tx) => tx.gas_price,
            TypedTransaction::Eip1559(tx) => {
                let base_fee = base_fee.unwrap_or_default();
                let with_tip = base_fee.saturating_add(tx.max_priority_fee_per_gas);
                if with_tip > tx.max_fee_per_gas {
                    tx.max_fee_per_gas
                } else {
                    with_tip
                }
            }
        }
    }

    /// Portion of the effective price that goes to the coinbase once the
    /// basefee is burned.
    pub fn priority_fee_per_gas(&self, base_fee: U256) -> U256 {
        self.effective_gas_price(Some(base_fee))
            .saturating_sub(base_fee)
    }

    /// Worst-case wei the sender must hold: gas prepayment plus value.
    pub fn upfront_cost(&self, base_fee: Option<U256>) -> U256 {
        self.effective_gas_price(base_fee)
            .saturating_mul(U256::from(self.gas_limit()))
            .saturating_add(self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee_tx(max_fee: u64, max_priority: u64) -> TypedTransaction {
        TypedTransaction::Eip1559(Eip1559Tx {
            from: H160::repeat_byte(0x01),
            max_fee_per_gas: max_fee.into(),
            max_priority_fee_per_gas: max_priority.into(),
            gas_limit: 21000,
            ..Default::default()
        })
    }

    #[test]
    fn effective_price_caps_at_max_fee() {
        let tx = fee_tx(100, 10);
        assert_eq!(tx.effective_gas_price(Some(95.into())), 100.into());
        assert_eq!(tx.effective_gas_price(Some(50.into())), 60.into());
        assert_eq!(tx.effective_gas_price(None), 10.into());
    }

    #[test]
    fn priority_fee_is_effective_minus_base() {
        let tx = fee_tx(100, 10);
        assert_eq!(tx.priority_fee_per_gas(95.into()), 5.into());
        assert_eq!(tx.priority_fee_per_gas(50.into()), 10.into());
    }

    #[test]
    fn legacy_price_ignores_base_fee() {
        let tx = TypedTransaction::Legacy(LegacyTx {
            gas_price: 7.into(),
            ..Default::default()
        });
        assert_eq!(tx.effective_gas_price(Some(3.into())), 7.into());
        assert_eq!(tx.priority_fee_per_gas(3.into()), 4.into());
    }
}
