//! Contract interfaces of the world registry and its components.
//!
//! Calls are encoded from the statically declared interfaces below. The ABI artifacts shipped
//! alongside the deployment are only checked to declare the entry points being used, so a run
//! against the wrong artifacts fails before touching the network.

use std::fs;
use std::path::{Path, PathBuf};

use alloy_sol_types::sol;
use serde::Deserialize;

use crate::error::InputError;

sol! {
    interface IWorld {
        function getComponent(uint256 id) external view returns (address);
    }

    interface IComponent {
        function getSchema() external pure returns (string[] memory keys, uint8[] memory values);
    }
}

pub const GET_COMPONENT: &str = "getComponent";
pub const GET_SCHEMA: &str = "getSchema";

/// A compiled contract artifact of the form `{ "abi": [...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractArtifact {
    #[serde(skip)]
    path: PathBuf,
    pub abi: Vec<AbiItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl ContractArtifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let buf = fs::read(path)
            .map_err(|source| InputError::Io { path: path.to_path_buf(), source })?;

        let mut artifact: Self = serde_json::from_slice(&buf)
            .map_err(|source| InputError::Json { path: path.to_path_buf(), source })?;
        artifact.path = path.to_path_buf();

        Ok(artifact)
    }

    pub fn function(&self, name: &str) -> Option<&AbiItem> {
        self.abi.iter().find(|item| item.kind == "function" && item.name.as_deref() == Some(name))
    }

    /// Fails unless the artifact declares `name` taking exactly `inputs` arguments.
    pub fn require_function(&self, name: &'static str, inputs: usize) -> Result<(), InputError> {
        match self.function(name) {
            Some(item) if item.inputs.len() == inputs => Ok(()),
            _ => Err(InputError::MissingFunction {
                artifact: self.path.clone(),
                function: name,
                inputs,
            }),
        }
    }

    /// Checks the artifact can serve as the world registry interface.
    pub fn require_world(&self) -> Result<(), InputError> {
        self.require_function(GET_COMPONENT, 1)
    }

    /// Checks the artifact can serve as the generic component interface.
    pub fn require_component(&self) -> Result<(), InputError> {
        self.require_function(GET_SCHEMA, 0)
    }
}
