use std::sync::Arc;

use alloy_primitives::Address;
use alloy_rpc_types_eth::BlockId;
use alloy_sol_types::SolCall;
use tracing::trace;

use crate::abi::IComponent;
use crate::error::{CallError, SchemaFetchError};
use crate::provider::ContractCaller;
use crate::types::{schema_value_type, ComponentSchema};

const LOG_TARGET: &str = "schema_cache::component";

/// Reader of the schema a component contract declares for itself.
///
/// Every component implements the same interface, so one client serves all of them.
#[derive(Debug)]
pub struct ComponentClient<C> {
    caller: Arc<C>,
}

impl<C> Clone for ComponentClient<C> {
    fn clone(&self) -> Self {
        Self { caller: Arc::clone(&self.caller) }
    }
}

impl<C: ContractCaller> ComponentClient<C> {
    pub fn new(caller: Arc<C>) -> Self {
        Self { caller }
    }

    pub async fn fetch_schema(
        &self,
        address: Address,
        block: BlockId,
    ) -> Result<ComponentSchema, SchemaFetchError> {
        let input = IComponent::getSchemaCall {}.abi_encode();
        let output = self.caller.eth_call(address, input.into(), block).await.map_err(|e| match e {
            CallError::Reverted(reason) => SchemaFetchError::Reverted { address, reason },
            e => SchemaFetchError::Transport(e),
        })?;

        let IComponent::getSchemaReturn { keys, values } =
            IComponent::getSchemaCall::abi_decode_returns(&output, true)?;

        let schema = into_schema(address, keys, values)?;
        trace!(target: LOG_TARGET, %address, keys = schema.keys.len(), "Fetched component schema.");

        Ok(schema)
    }
}

fn into_schema(
    address: Address,
    keys: Vec<String>,
    values: Vec<u8>,
) -> Result<ComponentSchema, SchemaFetchError> {
    let malformed = |reason: String| SchemaFetchError::Malformed { address, reason };

    if keys.is_empty() && values.is_empty() {
        return Err(malformed("schema is empty".into()));
    }

    if keys.len() != values.len() {
        return Err(malformed(format!(
            "{} keys but {} value types",
            keys.len(),
            values.len()
        )));
    }

    let values = values
        .into_iter()
        .enumerate()
        .map(|(i, code)| {
            schema_value_type(code)
                .map(str::to_string)
                .ok_or_else(|| malformed(format!("unknown value type {code} at position {i}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ComponentSchema { keys, values })
}
