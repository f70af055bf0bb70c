use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::{address, Address, Bytes, U256};
use alloy_rpc_types_eth::BlockId;
use alloy_sol_types::SolCall;
use alloy_transport::TransportErrorKind;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::abi::{IComponent, IWorld};
use crate::error::CallError;
use crate::provider::ContractCaller;
use crate::types::{schema_value_code, ComponentId, ComponentSchema};

pub const WORLD: Address = address!("40aEaA59D096ff56Cb25cDD7f8198108fb67A519");
pub const LATEST_BLOCK: u64 = 1_000;

/// Deterministic in-memory chain serving a world registry and its components.
#[derive(Debug, Default)]
pub struct MockChain {
    components: HashMap<U256, Address>,
    schemas: HashMap<Address, (Vec<String>, Vec<u8>)>,
    raw_responses: HashMap<Address, Vec<u8>>,
    broken: HashSet<Address>,
    flaky: Mutex<HashMap<Address, usize>>,
    latency: Option<Duration>,
    unreachable: bool,
    log: Mutex<Vec<(Address, Bytes, BlockId)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, id: ComponentId, address: Address) -> Self {
        self.components.insert(id.value(), address);
        self
    }

    pub fn with_schema(self, address: Address, schema: ComponentSchema) -> Self {
        let codes = schema
            .values
            .iter()
            .map(|ty| schema_value_code(ty).unwrap_or_else(|| panic!("unknown type {ty}")))
            .collect();
        self.with_raw_schema(address, schema.keys, codes)
    }

    pub fn with_raw_schema(mut self, address: Address, keys: Vec<String>, values: Vec<u8>) -> Self {
        self.schemas.insert(address, (keys, values));
        self
    }

    /// Registers `id` at `address` and serves `schema` from it.
    pub fn with_registered(self, id: &str, address: Address, schema: ComponentSchema) -> Self {
        let id = ComponentId::parse(id).expect("valid id");
        self.with_component(id, address).with_schema(address, schema)
    }

    /// Every call to `address` answers with `bytes` verbatim.
    pub fn with_raw_response(mut self, address: Address, bytes: Vec<u8>) -> Self {
        self.raw_responses.insert(address, bytes);
        self
    }

    /// Every call to `address` fails at the transport level.
    pub fn with_broken_address(mut self, address: Address) -> Self {
        self.broken.insert(address);
        self
    }

    /// The first `failures` calls to `address` fail at the transport level.
    pub fn with_flaky_address(self, address: Address, failures: usize) -> Self {
        self.flaky.lock().insert(address, failures);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The node cannot be reached at all.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn calls(&self) -> Vec<(Address, Bytes, BlockId)> {
        self.log.lock().clone()
    }

    pub fn calls_to(&self, address: Address) -> usize {
        self.log.lock().iter().filter(|(to, ..)| *to == address).count()
    }

    /// Ids the registry was asked about, in call order.
    pub fn registry_lookups(&self) -> Vec<U256> {
        self.log
            .lock()
            .iter()
            .filter(|(to, ..)| *to == WORLD)
            .filter_map(|(_, input, _)| IWorld::getComponentCall::abi_decode(input, true).ok())
            .map(|call| call.id)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, to: Address, input: &[u8]) -> Result<Bytes, CallError> {
        if self.unreachable || self.broken.contains(&to) {
            return Err(TransportErrorKind::custom_str("connection refused").into());
        }

        if let Some(remaining) = self.flaky.lock().get_mut(&to) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportErrorKind::custom_str("connection reset by peer").into());
            }
        }

        if let Some(bytes) = self.raw_responses.get(&to) {
            return Ok(bytes.clone().into());
        }

        if to == WORLD {
            let call = IWorld::getComponentCall::abi_decode(input, true)
                .map_err(|e| CallError::Reverted(e.to_string()))?;
            return match self.components.get(&call.id) {
                Some(address) => {
                    Ok(IWorld::getComponentCall::abi_encode_returns(&(*address,)).into())
                }
                None => Err(CallError::Reverted("component not registered".into())),
            };
        }

        match self.schemas.get(&to) {
            Some((keys, values)) if input == IComponent::getSchemaCall::SELECTOR => {
                Ok(IComponent::getSchemaCall::abi_encode_returns(&(keys.clone(), values.clone()))
                    .into())
            }
            _ => Err(CallError::Reverted(String::new())),
        }
    }
}

#[async_trait]
impl ContractCaller for MockChain {
    async fn eth_call(
        &self,
        to: Address,
        input: Bytes,
        block: BlockId,
    ) -> Result<Bytes, CallError> {
        self.log.lock().push((to, input.clone(), block));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let response = self.respond(to, &input);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }

    async fn latest_block(&self) -> Result<u64, CallError> {
        if self.unreachable {
            return Err(TransportErrorKind::custom_str("connection refused").into());
        }
        Ok(LATEST_BLOCK)
    }
}

pub fn schema(keys: &[&str], values: &[&str]) -> ComponentSchema {
    ComponentSchema {
        keys: keys.iter().map(|k| k.to_string()).collect(),
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}
