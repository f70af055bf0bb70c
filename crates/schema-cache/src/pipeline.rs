use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use alloy_rpc_types_eth::BlockId;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::component::ComponentClient;
use crate::error::{CallError, PipelineError, RegistryLookupError, ResolveError, SchemaFetchError};
use crate::provider::ContractCaller;
use crate::registry::RegistryClient;
use crate::types::{ComponentId, ComponentSchema, SchemaCatalog};

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod test;

const LOG_TARGET: &str = "schema_cache::pipeline";

pub const DEFAULT_CONCURRENCY: usize = 16;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of component resolution chains in flight.
    pub concurrency: NonZeroUsize,
    /// Block every call is pinned to. The latest block at the start of the run if unset.
    pub block: Option<u64>,
    pub retry: RetryPolicy,
    /// Upper bound on a single remote call, retries excluded.
    pub call_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).expect("non-zero"),
            block: None,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Exponential backoff applied to calls failing with a retryable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { max_retries: 0, initial_backoff: Duration::ZERO }
    }

    /// Delay before retry number `attempt` (zero based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, initial_backoff: Duration::from_millis(250) }
    }
}

#[derive(Debug)]
pub struct Failure {
    pub id: ComponentId,
    pub error: ResolveError,
}

impl Failure {
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Schemas of every component that resolved, in input order.
    pub catalog: SchemaCatalog,
    /// Components that failed, in input order.
    pub failures: Vec<Failure>,
    /// Block all calls were made against.
    pub block: u64,
    /// Number of input ids that were not processed (reserved or duplicate).
    pub skipped: usize,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves the schema of each component registered in a world.
#[derive(Debug)]
pub struct Pipeline<C> {
    caller: Arc<C>,
    registry: RegistryClient<C>,
    components: ComponentClient<C>,
    config: PipelineConfig,
}

impl<C: ContractCaller> Pipeline<C> {
    pub fn new(caller: Arc<C>, world: Address, config: PipelineConfig) -> Self {
        Self {
            registry: RegistryClient::new(Arc::clone(&caller), world),
            components: ComponentClient::new(Arc::clone(&caller)),
            caller,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Same as [`Pipeline::run`], but gives up as soon as `cancel` fires. In-flight calls are
    /// dropped and no report is produced.
    pub async fn run_until_cancelled(
        &self,
        ids: &[ComponentId],
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(target: LOG_TARGET, "Run cancelled.");
                Err(PipelineError::Cancelled)
            }
            report = self.run(ids) => report,
        }
    }

    /// Resolves every non-reserved id in `ids`.
    ///
    /// Failures are scoped to the component they happened for and collected into the report.
    /// The node is always asked for its latest block first, so failing to reach it aborts the
    /// run before any component is looked up, even with a configured block.
    pub async fn run(&self, ids: &[ComponentId]) -> Result<RunReport, PipelineError> {
        let latest = self.caller.latest_block().await.map_err(PipelineError::Transport)?;
        let block = match self.config.block {
            Some(block) if block > latest => {
                return Err(PipelineError::BlockAhead { block, latest });
            }
            Some(block) => block,
            None => latest,
        };
        let block_id = BlockId::number(block);

        let (queue, skipped) = dedup(ids);
        info!(
            target: LOG_TARGET,
            components = queue.len(),
            skipped,
            block,
            concurrency = self.config.concurrency.get(),
            "Resolving component schemas."
        );

        let mut outcomes: Vec<(usize, Result<ComponentSchema, ResolveError>)> =
            stream::iter(queue.iter().enumerate())
                .map(|(index, id)| async move { (index, self.resolve(id, block_id).await) })
                .buffer_unordered(self.config.concurrency.get())
                .collect()
                .await;
        outcomes.sort_unstable_by_key(|(index, _)| *index);

        let mut catalog = SchemaCatalog::with_capacity(queue.len());
        let mut failures = Vec::new();
        for (id, (_, outcome)) in queue.into_iter().zip(outcomes) {
            match outcome {
                Ok(schema) => {
                    catalog.insert(id, schema);
                }
                Err(error) => failures.push(Failure { id, error }),
            }
        }

        info!(
            target: LOG_TARGET,
            resolved = catalog.len(),
            failed = failures.len(),
            "Finished resolving component schemas."
        );

        Ok(RunReport { catalog, failures, block, skipped })
    }

    async fn resolve(
        &self,
        id: &ComponentId,
        block: BlockId,
    ) -> Result<ComponentSchema, ResolveError> {
        let result = async {
            let address = self
                .with_retry(id, "registry", move || self.registry.resolve_address(id, block))
                .await?;
            let schema = self
                .with_retry(id, "schema", move || self.components.fetch_schema(address, block))
                .await?;
            Ok::<_, ResolveError>(schema)
        }
        .await;

        match &result {
            Ok(schema) => {
                debug!(target: LOG_TARGET, %id, keys = schema.keys.len(), "Resolved component.")
            }
            Err(e) => {
                let kind = e.kind();
                warn!(target: LOG_TARGET, %id, kind, error = %e, "Failed to resolve component.")
            }
        }

        result
    }

    async fn with_retry<T, E, F, Fut>(
        &self,
        id: &ComponentId,
        stage: &str,
        mut call: F,
    ) -> Result<T, E>
    where
        E: StageError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let retry = self.config.retry;
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(self.config.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(self.config.call_timeout)),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    let backoff = retry.backoff(attempt);
                    attempt += 1;
                    debug!(
                        target: LOG_TARGET,
                        %id,
                        stage,
                        attempt,
                        ?backoff,
                        error = %e,
                        "Retrying call."
                    );
                    tokio::time::sleep(backoff).await;
                }
                result => return result,
            }
        }
    }
}

/// Drops the reserved zero id and repeated ids, keeping the first occurrence.
fn dedup(ids: &[ComponentId]) -> (Vec<ComponentId>, usize) {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut queue = Vec::with_capacity(ids.len());

    for id in ids {
        if id.is_zero() {
            debug!(target: LOG_TARGET, %id, "Skipping reserved component id.");
        } else if !seen.insert(id.value()) {
            warn!(target: LOG_TARGET, %id, "Skipping duplicate component id.");
        } else {
            queue.push(id.clone());
        }
    }

    let skipped = ids.len() - queue.len();
    (queue, skipped)
}

trait StageError: Display {
    fn is_retryable(&self) -> bool;
    fn timed_out(after: Duration) -> Self;
}

impl StageError for RegistryLookupError {
    fn is_retryable(&self) -> bool {
        RegistryLookupError::is_retryable(self)
    }

    fn timed_out(after: Duration) -> Self {
        RegistryLookupError::Transport(CallError::Timeout(after))
    }
}

impl StageError for SchemaFetchError {
    fn is_retryable(&self) -> bool {
        SchemaFetchError::is_retryable(self)
    }

    fn timed_out(after: Duration) -> Self {
        SchemaFetchError::Transport(CallError::Timeout(after))
    }
}
