use alloy_json_rpc::RpcError;
use alloy_primitives::{Address, Bytes, TxKind};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{BlockId, TransactionInput, TransactionRequest};
use alloy_transport::{Transport, TransportError};
use async_trait::async_trait;

use crate::error::CallError;

// JSON-RPC error code nodes use for `execution reverted`.
const EXECUTION_REVERTED: i64 = 3;

/// Read-only call capability against the remote node.
///
/// Implementations must be safe to share across concurrent resolution chains.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Executes a read-only call of `to` with `input` against the state at `block`.
    async fn eth_call(&self, to: Address, input: Bytes, block: BlockId)
        -> Result<Bytes, CallError>;

    /// Number of the most recent block known to the node.
    async fn latest_block(&self) -> Result<u64, CallError>;
}

#[async_trait]
impl<T> ContractCaller for RootProvider<T>
where
    T: Transport + Clone,
{
    async fn eth_call(
        &self,
        to: Address,
        input: Bytes,
        block: BlockId,
    ) -> Result<Bytes, CallError> {
        let request = TransactionRequest {
            to: Some(TxKind::Call(to)),
            input: TransactionInput::new(input),
            ..Default::default()
        };

        Provider::call(self, &request).block(block).await.map_err(classify)
    }

    async fn latest_block(&self) -> Result<u64, CallError> {
        Provider::get_block_number(self).await.map_err(CallError::from)
    }
}

/// Separates reverts reported by the node from failures to talk to it.
fn classify(err: TransportError) -> CallError {
    match err {
        RpcError::ErrorResp(payload)
            if payload.code == EXECUTION_REVERTED || payload.message.contains("revert") =>
        {
            CallError::Reverted(payload.message.to_string())
        }
        other => CallError::Transport(other),
    }
}
