use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use alloy_primitives::Address;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use schema_cache::input::DEFAULT_COMPONENT_LIST_FILE;
use schema_cache::store::DEFAULT_OUTPUT_FILE;
use schema_cache::{PipelineConfig, RetryPolicy};
use tracing_log::{AsTrace, LogTracer};
use tracing_subscriber::FmtSubscriber;
use url::Url;

pub const RPC_URL_ENV_VAR: &str = "ETH_RPC_URL";
pub const WORLD_ADDRESS_ENV_VAR: &str = "WORLD_ADDRESS";

const DEFAULT_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_WORLD_ADDRESS: &str = "0x40aEaA59D096ff56Cb25cDD7f8198108fb67A519";

/// Caches the schema of every component registered in a world.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CacheArgs {
    #[arg(long, env = RPC_URL_ENV_VAR, default_value = DEFAULT_RPC_URL)]
    #[arg(value_name = "URL")]
    #[arg(help = "The JSON-RPC endpoint of the node, over http(s) or ws(s).")]
    pub rpc_url: Url,

    #[arg(long = "world", env = WORLD_ADDRESS_ENV_VAR, default_value = DEFAULT_WORLD_ADDRESS)]
    #[arg(value_name = "ADDRESS")]
    #[arg(help = "Address of the world contract holding the component registry.")]
    pub world_address: Address,

    #[arg(long, default_value = DEFAULT_COMPONENT_LIST_FILE)]
    #[arg(help = "File listing the component ids to resolve.")]
    pub components: PathBuf,

    #[arg(long, default_value = "World.json")]
    #[arg(help = "ABI artifact of the world contract.")]
    pub world_abi: PathBuf,

    #[arg(long, default_value = "Component.json")]
    #[arg(help = "ABI artifact shared by all component contracts.")]
    pub component_abi: PathBuf,

    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    #[arg(help = "Where to write the schema catalog. Any existing file is replaced.")]
    pub output: PathBuf,

    #[arg(long)]
    #[arg(help = "Block to read the registry at. Defaults to the latest block.")]
    pub block: Option<u64>,

    #[arg(long, default_value = "16")]
    #[arg(help = "Maximum number of components resolved concurrently.")]
    pub concurrency: NonZeroUsize,

    #[arg(long, default_value_t = 2)]
    #[arg(help = "Retries of a call failing with a transport error.")]
    pub max_retries: u32,

    #[arg(long, default_value_t = 250)]
    #[arg(help = "Delay before the first retry, doubled on every following one.")]
    pub retry_backoff_ms: u64,

    #[arg(long, default_value_t = 30)]
    #[arg(help = "Timeout of a single call, in seconds.")]
    pub call_timeout_secs: u64,

    #[arg(long)]
    #[arg(help = "Abort the run if it has not completed after this many seconds.")]
    pub deadline_secs: Option<u64>,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl CacheArgs {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            concurrency: self.concurrency,
            block: self.block,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_backoff: Duration::from_millis(self.retry_backoff_ms),
            },
            call_timeout: Duration::from_secs(self.call_timeout_secs),
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn init_logging(&self) -> Result<(), Box<dyn std::error::Error>> {
        let level = self.verbose.log_level_filter().as_trace();
        let default_log_filter = format!("off,cache_schemas={level},schema_cache={level}");

        LogTracer::init()?;

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_log_filter)),
            )
            .finish();

        Ok(tracing::subscriber::set_global_default(subscriber)?)
    }
}
