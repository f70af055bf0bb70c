#![cfg_attr(not(test), warn(unused_crate_dependencies))]

//! Resolution of component schemas registered in a world.
//!
//! Every component id is looked up in the world registry to find the contract implementing it,
//! that contract is asked for the schema it declares, and the resulting catalog is written to a
//! JSON file. All calls of a run are read-only and pinned to a single block.

pub mod abi;
pub mod component;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use component::ComponentClient;
pub use error::{
    CallError, InputError, PersistenceError, PipelineError, RegistryLookupError, ResolveError,
    SchemaFetchError,
};
pub use pipeline::{Failure, Pipeline, PipelineConfig, RetryPolicy, RunReport};
pub use provider::ContractCaller;
pub use registry::RegistryClient;
pub use store::ResultStore;
pub use types::{ComponentId, ComponentSchema, SchemaCatalog};
