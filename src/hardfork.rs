use std::str::FromStr;

/// Named revisions of the chain rules, in activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hardfork {
    Frontier,
    Homestead,
    Tangerine,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    MuirGlacier,
    Berlin,
    London,
    ArrowGlacier,
    GrayGlacier,
    Merge,
    Shanghai,
}

impl Hardfork {
    /// EIP-1559 (basefee) is active.
    pub fn has_base_fee(self) -> bool {
        self >= Hardfork::London
    }

    /// Proof-of-stake rules: DIFFICULTY becomes PREVRANDAO.
    pub fn is_post_merge(self) -> bool {
        self >= Hardfork::Merge
    }

    /// EIP-2929 warm/cold account accounting is active.
    pub fn has_access_lists(self) -> bool {
        self >= Hardfork::Berlin
    }

    /// Receipts carry a status byte instead of a state root.
    pub fn has_receipt_status(self) -> bool {
        self >= Hardfork::Byzantium
    }

    /// Rule set for the interpreted engine. The engine ships presets for the
    /// major revisions only; in-between forks use the nearest earlier preset.
    pub fn interp_rules(self) -> evm::Config {
        match self {
            Hardfork::Frontier
            | Hardfork::Homestead
            | Hardfork::Tangerine
            | Hardfork::SpuriousDragon
            | Hardfork::Byzantium
            | Hardfork::Constantinople
            | Hardfork::Petersburg => evm::Config::frontier(),
            Hardfork::Istanbul | Hardfork::MuirGlacier => evm::Config::istanbul(),
            Hardfork::Berlin => evm::Config::berlin(),
            Hardfork::London | Hardfork::ArrowGlacier | Hardfork::GrayGlacier => {
                evm::Config::london()
            }
            Hardfork::Merge => evm::Config::merge(),
            Hardfork::Shanghai => evm::Config::shanghai(),
        }
    }

    /// Rule set identifier for the native engine.
    pub fn native_spec(self) -> revm::primitives::SpecId {
        use revm::primitives::SpecId;
        match self {
            Hardfork::Frontier => SpecId::FRONTIER,
            Hardfork::Homestead => SpecId::HOMESTEAD,
            Hardfork::Tangerine => SpecId::TANGERINE,
            Hardfork::SpuriousDragon => SpecId::SPURIOUS_DRAGON,
            Hardfork::Byzantium => SpecId::BYZANTIUM,
            Hardfork::Constantinople => SpecId::CONSTANTINOPLE,
            Hardfork::Petersburg => SpecId::PETERSBURG,
            Hardfork::Istanbul => SpecId::ISTANBUL,
            Hardfork::MuirGlacier => SpecId::MUIR_GLACIER,
            Hardfork::Berlin => SpecId::BERLIN,
            Hardfork::London => SpecId::LONDON,
            Hardfork::ArrowGlacier => SpecId::ARROW_GLACIER,
            Hardfork::GrayGlacier => SpecId::GRAY_GLACIER,
            Hardfork::Merge => SpecId::MERGE,
            Hardfork::Shanghai => SpecId::SHANGHAI,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Hardfork::Frontier => "frontier",
            Hardfork::Homestead => "homestead",
            Hardfork::Tangerine => "tangerineWhistle",
            Hardfork::SpuriousDragon => "spuriousDragon",
            Hardfork::Byzantium => "byzantium",
            Hardfork::Constantinople => "constantinople",
            Hardfork::Petersburg => "petersburg",
            Hardfork::Istanbul => "istanbul",
            Hardfork::MuirGlacier => "muirGlacier",
            Hardfork::Berlin => "berlin",
            Hardfork::London => "london",
            Hardfork::ArrowGlacier => "arrowGlacier",
            Hardfork::GrayGlacier => "grayGlacier",
            Hardfork::Merge => "merge",
            Hardfork::Shanghai => "shanghai",
        }
    }
}

impl FromStr for Hardfork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            Hardfork::Frontier,
            Hardfork::Homestead,
            Hardfork::Tangerine,
            Hardfork::SpuriousDragon,
            Hardfork::Byzantium,
            Hardfork::Constantinople,
            Hardfork::Petersburg,
            Hardfork::Istanbul,
            Hardfork::MuirGlacier,
            Hardfork::Berlin,
            Hardfork::London,
            Hardfork::ArrowGlacier,
            Hardfork::GrayGlacier,
            Hardfork::Merge,
            Hardfork::Shanghai,
        ];
        all.iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown hardfork: {}", s))
    }
}

/// Maps a block number to the hardfork active at that height. Injected into
/// the adapter at construction; the provider owns the activation schedule.
pub type HardforkSelector = Box<dyn Fn(u64) -> Hardfork + Send + Sync>;

/// A selector for chains where every block runs the same rules.
pub fn fixed_selector(fork: Hardfork) -> HardforkSelector {
    Box::new(move |_| fork)
}
