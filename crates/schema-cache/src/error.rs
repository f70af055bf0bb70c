use std::path::PathBuf;
use std::time::Duration;

use alloy_primitives::Address;
use alloy_transport::TransportError;

use crate::types::ComponentId;

/// Error returned by a [`ContractCaller`](crate::provider::ContractCaller).
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

impl CallError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CallError::Reverted(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryLookupError {
    #[error("component {0} is not registered in the world")]
    NotFound(ComponentId),
    #[error("registry call failed: {0}")]
    Transport(CallError),
    #[error("failed to decode registry response: {0}")]
    Decode(#[from] alloy_sol_types::Error),
}

impl RegistryLookupError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryLookupError::Transport(e) if e.is_retryable())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaFetchError {
    #[error("schema call to {address} reverted: {reason}")]
    Reverted { address: Address, reason: String },
    #[error("schema call failed: {0}")]
    Transport(CallError),
    #[error("failed to decode schema response: {0}")]
    Decode(#[from] alloy_sol_types::Error),
    #[error("malformed schema at {address}: {reason}")]
    Malformed { address: Address, reason: String },
}

impl SchemaFetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchemaFetchError::Transport(e) if e.is_retryable())
    }
}

/// Failure of a single component's resolution chain.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Registry(#[from] RegistryLookupError),
    #[error(transparent)]
    Schema(#[from] SchemaFetchError),
}

impl ResolveError {
    /// Name of the failing stage, as shown in the run report.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::Registry(_) => "RegistryLookupError",
            ResolveError::Schema(_) => "SchemaFetchError",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ResolveError::Registry(e) => e.is_retryable(),
            ResolveError::Schema(e) => e.is_retryable(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to reach the node before starting: {0}")]
    Transport(CallError),
    #[error("block {block} is ahead of the latest block {latest}")]
    BlockAhead { block: u64, latest: u64 },
    #[error("run was cancelled before all components were resolved")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to access {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to serialize catalog: {0}")]
    Serialize(serde_json::Error),
    #[error("failed to move catalog into place at {path}: {source}")]
    Persist { path: PathBuf, source: std::io::Error },
    #[error("failed to parse catalog at {path}: {source}")]
    Deserialize { path: PathBuf, source: serde_json::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("invalid component id `{id}`: {reason}")]
    InvalidComponentId { id: String, reason: String },
    #[error("{artifact} does not declare function `{function}` with {inputs} input(s)")]
    MissingFunction { artifact: PathBuf, function: &'static str, inputs: usize },
}
