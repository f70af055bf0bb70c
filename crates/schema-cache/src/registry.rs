use std::sync::Arc;

use alloy_primitives::Address;
use alloy_rpc_types_eth::BlockId;
use alloy_sol_types::SolCall;
use tracing::trace;

use crate::abi::IWorld;
use crate::error::{CallError, RegistryLookupError};
use crate::provider::ContractCaller;
use crate::types::ComponentId;

const LOG_TARGET: &str = "schema_cache::registry";

/// Reader of the world's component registry.
#[derive(Debug)]
pub struct RegistryClient<C> {
    caller: Arc<C>,
    world: Address,
}

impl<C> Clone for RegistryClient<C> {
    fn clone(&self) -> Self {
        Self { caller: Arc::clone(&self.caller), world: self.world }
    }
}

impl<C: ContractCaller> RegistryClient<C> {
    pub fn new(caller: Arc<C>, world: Address) -> Self {
        Self { caller, world }
    }

    pub fn world(&self) -> Address {
        self.world
    }

    /// Returns the address of the contract registered for `id`.
    ///
    /// A revert or a zero address both mean the world has no mapping for the id.
    pub async fn resolve_address(
        &self,
        id: &ComponentId,
        block: BlockId,
    ) -> Result<Address, RegistryLookupError> {
        debug_assert!(!id.is_zero(), "the zero component id is never registered");

        let input = IWorld::getComponentCall { id: id.value() }.abi_encode();
        let output = match self.caller.eth_call(self.world, input.into(), block).await {
            Ok(output) => output,
            Err(CallError::Reverted(reason)) => {
                trace!(target: LOG_TARGET, %id, %reason, "Registry lookup reverted.");
                return Err(RegistryLookupError::NotFound(id.clone()));
            }
            Err(e) => return Err(RegistryLookupError::Transport(e)),
        };

        let address = IWorld::getComponentCall::abi_decode_returns(&output, true)?._0;
        if address.is_zero() {
            return Err(RegistryLookupError::NotFound(id.clone()));
        }

        trace!(target: LOG_TARGET, %id, %address, "Resolved component address.");
        Ok(address)
    }
}
