use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Catalog of resolved schemas, iterated in input-list order.
pub type SchemaCatalog = IndexMap<ComponentId, ComponentSchema>;

/// Identifier of a component registered in the world.
///
/// The hex string it was read from is kept verbatim and used as the catalog key, while the
/// numeric value is what the registry is queried with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentId {
    raw: String,
    value: U256,
}

impl ComponentId {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let invalid = |reason: &str| InputError::InvalidComponentId {
            id: raw.to_string(),
            reason: reason.to_string(),
        };

        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or_else(|| invalid("missing 0x prefix"))?;

        if digits.is_empty() {
            return Err(invalid("no hex digits"));
        }

        let value = U256::from_str_radix(digits, 16).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self { raw: raw.to_string(), value })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    /// The zero id is reserved and never registered.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl FromStr for ComponentId {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ComponentId {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ComponentId> for String {
    fn from(id: ComponentId) -> Self {
        id.raw
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Column layout a component contract exposes. Order of both sequences is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSchema {
    pub keys: Vec<String>,
    pub values: Vec<String>,
}

// Mirrors `enum SchemaValue` of `@latticexyz/solecs` 1.x (`src/LibTypes.sol`), where a
// variant's position is its `uint8` code. A variant added or moved there must be mirrored here.
const SCHEMA_VALUE_TYPES: [&str; 35] = [
    "bool",
    "int8",
    "int16",
    "int32",
    "int64",
    "int128",
    "int256",
    "int",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uint128",
    "uint256",
    "bytes",
    "string",
    "address",
    "bytes4",
    "bool[]",
    "int8[]",
    "int16[]",
    "int32[]",
    "int64[]",
    "int128[]",
    "int256[]",
    "int[]",
    "uint8[]",
    "uint16[]",
    "uint32[]",
    "uint64[]",
    "uint128[]",
    "uint256[]",
    "bytes[]",
    "string[]",
    "address[]",
];

/// Returns the type name of a `SchemaValue` discriminant, if it is a known one.
pub fn schema_value_type(code: u8) -> Option<&'static str> {
    SCHEMA_VALUE_TYPES.get(code as usize).copied()
}

/// Inverse of [`schema_value_type`].
pub fn schema_value_code(ty: &str) -> Option<u8> {
    SCHEMA_VALUE_TYPES.iter().position(|t| *t == ty).map(|i| i as u8)
}
