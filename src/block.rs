use ethereum_types::{H160, H256, U256};

use crate::err::ConfigError;
use crate::hardfork::Hardfork;

/// Environment the transaction executes in: the header fields of the block
/// being simulated or assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockContext {
    pub number: U256,
    pub coinbase: H160,
    pub timestamp: U256,
    pub base_fee: Option<U256>,
    pub gas_limit: U256,
    pub difficulty: U256,
    /// Becomes prevRandao at and after the merge.
    pub mix_hash: Option<H256>,
    pub state_root: H256,
    pub parent_hash: H256,
}

impl BlockContext {
    /// Difficulty as fed to the engines, clamped to their `2^32 - 1` bound.
    pub fn clamped_difficulty(&self) -> U256 {
        let bound = U256::from(u32::MAX);
        if self.difficulty > bound {
            bound
        } else {
            self.difficulty
        }
    }

    /// The randomness word execution observes, or an error when the header
    /// cannot legally run under `fork`.
    pub fn randomness(&self, fork: Hardfork) -> Result<Option<H256>, ConfigError> {
        if fork.is_post_merge() {
            match self.mix_hash {
                Some(mix_hash) => Ok(Some(mix_hash)),
                None => Err(ConfigError::MixHashRequired),
            }
        } else {
            Ok(None)
        }
    }

    /// Copy of the context with `baseFeePerGas` forced to zero, used by the
    /// dry-run basefee substitution.
    pub fn with_zero_base_fee(&self) -> BlockContext {
        let mut block = self.clone();
        block.base_fee = Some(U256::zero());
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_is_clamped_to_u32_max() {
        let block = BlockContext {
            difficulty: U256::from(u64::MAX),
            ..Default::default()
        };
        assert_eq!(block.clamped_difficulty(), U256::from(u32::MAX));
    }

    #[test]
    fn randomness_requires_mix_hash_post_merge() {
        let block = BlockContext::default();
        assert_eq!(
            block.randomness(Hardfork::Merge),
            Err(ConfigError::MixHashRequired)
        );
        assert_eq!(block.randomness(Hardfork::London), Ok(None));

        let block = BlockContext {
            mix_hash: Some(H256::repeat_byte(0x11)),
            ..Default::default()
        };
        assert_eq!(
            block.randomness(Hardfork::Merge),
            Ok(Some(H256::repeat_byte(0x11)))
        );
    }
}
