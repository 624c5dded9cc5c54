mod interp;
mod listener;
mod native;

pub use interp::InterpVm;
pub use native::NativeVm;

use std::sync::Arc;

use crate::adapter::{BlockHashProvider, VmAdapter};
use crate::config::{BackendKind, VmConfig};
use crate::err::Error;
use crate::hardfork::HardforkSelector;

/// Build the adapter selected by `config.backend`. The provider holds the
/// result by interface only.
pub fn create(
    config: VmConfig,
    blockchain: Arc<dyn BlockHashProvider>,
    selector: HardforkSelector,
) -> Result<Box<dyn VmAdapter>, Error> {
    match config.backend {
        BackendKind::Interpreted => Ok(Box::new(InterpVm::new(config, blockchain, selector)?)),
        BackendKind::Native => Ok(Box::new(NativeVm::new(config, blockchain, selector)?)),
    }
}
