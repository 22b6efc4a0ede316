//! Chain registry: numeric chain ids, their wire form and display names.
//!
//! A single process-wide registry is seeded with well-known public chains and their test
//! networks. It lives behind one `RwLock`, so registration from any thread is serialized
//! against lookups.

use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainDescriptor {
    #[serde(rename = "chainID")]
    pub numeric_id: u64,
    #[serde(rename = "wireId")]
    pub wire_id: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl ChainDescriptor {
    /// Descriptor for a chain the registry does not know about.
    pub fn unregistered(numeric_id: u64) -> Self {
        Self {
            numeric_id,
            wire_id: hex_wire_id(numeric_id),
            display_name: "unknown".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    pub display_name: String,
    pub numeric_id: u64,
    pub wire_id: String,
}

impl ChainEntry {
    pub fn new(
        display_name: impl Into<String>,
        numeric_id: u64,
        wire_id: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            numeric_id,
            wire_id: wire_id.into(),
        }
    }

    /// Entry whose wire id is the `0x`-prefixed lowercase hex of `numeric_id`.
    pub fn hex(display_name: impl Into<String>, numeric_id: u64) -> Self {
        Self::new(display_name, numeric_id, hex_wire_id(numeric_id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    wire_by_numeric: HashMap<u64, String>,
    chain_by_wire: HashMap<String, ChainDescriptor>,
}

impl ChainRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(default_chains());
        registry
    }

    pub fn lookup_by_numeric_id(&self, numeric_id: u64) -> Option<ChainDescriptor> {
        let wire = self.wire_by_numeric.get(&numeric_id)?;
        self.chain_by_wire.get(wire).cloned()
    }

    pub fn lookup_by_wire_id(&self, wire_id: &str) -> Option<ChainDescriptor> {
        self.chain_by_wire.get(wire_id).cloned()
    }

    /// Inserts or overwrites entries, last write wins. Both tables stay one-to-one: an entry
    /// that moves a numeric id to a new wire id (or the reverse) evicts the stale pairing.
    pub fn register(&mut self, entries: impl IntoIterator<Item = ChainEntry>) {
        for entry in entries {
            if let Some(old_wire) = self.wire_by_numeric.remove(&entry.numeric_id) {
                self.chain_by_wire.remove(&old_wire);
            }
            if let Some(old) = self.chain_by_wire.remove(&entry.wire_id) {
                self.wire_by_numeric.remove(&old.numeric_id);
            }
            self.wire_by_numeric
                .insert(entry.numeric_id, entry.wire_id.clone());
            self.chain_by_wire.insert(
                entry.wire_id.clone(),
                ChainDescriptor {
                    numeric_id: entry.numeric_id,
                    wire_id: entry.wire_id,
                    display_name: entry.display_name,
                },
            );
        }
    }

    pub fn snapshot(&self) -> Vec<ChainDescriptor> {
        let mut chains: Vec<ChainDescriptor> = self.chain_by_wire.values().cloned().collect();
        chains.sort_by_key(|c| c.numeric_id);
        chains
    }

    /// Maps a wallet-reported chain id (hex or decimal string) to a descriptor. Exact wire
    /// matches win; otherwise the value is parsed and looked up numerically.
    pub fn resolve_reported(&self, raw: &str) -> Result<ChainDescriptor, PortError> {
        if let Some(found) = self.lookup_by_wire_id(raw) {
            return Ok(found);
        }
        let numeric_id = parse_chain_id(raw)?;
        Ok(self
            .lookup_by_numeric_id(numeric_id)
            .unwrap_or_else(|| ChainDescriptor::unregistered(numeric_id)))
    }

    pub fn describe(&self, numeric_id: u64) -> ChainDescriptor {
        self.lookup_by_numeric_id(numeric_id)
            .unwrap_or_else(|| ChainDescriptor::unregistered(numeric_id))
    }
}

static REGISTRY: LazyLock<RwLock<ChainRegistry>> =
    LazyLock::new(|| RwLock::new(ChainRegistry::with_defaults()));

fn read<T>(f: impl FnOnce(&ChainRegistry) -> T) -> T {
    let guard = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
}

pub fn lookup_by_numeric_id(numeric_id: u64) -> Option<ChainDescriptor> {
    read(|r| r.lookup_by_numeric_id(numeric_id))
}

pub fn lookup_by_wire_id(wire_id: &str) -> Option<ChainDescriptor> {
    read(|r| r.lookup_by_wire_id(wire_id))
}

pub fn describe_chain(numeric_id: u64) -> ChainDescriptor {
    read(|r| r.describe(numeric_id))
}

pub fn resolve_reported(raw: &str) -> Result<ChainDescriptor, PortError> {
    read(|r| r.resolve_reported(raw))
}

/// Registers chains in the process-wide registry and returns the resulting snapshot.
pub fn register_chains(entries: impl IntoIterator<Item = ChainEntry>) -> Vec<ChainDescriptor> {
    let mut guard = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    guard.register(entries);
    tracing::debug!(chains = guard.chain_by_wire.len(), "chain registry updated");
    guard.snapshot()
}

pub fn registry_snapshot() -> Vec<ChainDescriptor> {
    read(ChainRegistry::snapshot)
}

pub fn hex_wire_id(numeric_id: u64) -> String {
    format!("0x{numeric_id:x}")
}

pub fn parse_chain_id(raw: &str) -> Result<u64, PortError> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| PortError::Validation(format!("invalid hex chain id '{raw}': {e}")))
    } else {
        raw.parse()
            .map_err(|e| PortError::Validation(format!("invalid chain id '{raw}': {e}")))
    }
}

/// Accepts the shapes wallets use for chain ids: hex string, decimal string or number.
pub fn chain_id_from_json(value: &serde_json::Value) -> Result<u64, PortError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let s = value
        .as_str()
        .ok_or_else(|| PortError::Validation("chain id must be string or number".to_owned()))?;
    parse_chain_id(s)
}

fn default_chains() -> Vec<ChainEntry> {
    vec![
        ChainEntry::hex("mainnet", 1),
        ChainEntry::hex("ropsten", 3),
        ChainEntry::hex("rinkeby", 4),
        ChainEntry::hex("goerli", 5),
        ChainEntry::hex("kardiachain", 24),
        ChainEntry::hex("kovan", 42),
        ChainEntry::hex("binance", 56),
        ChainEntry::hex("binance-testnet", 97),
        ChainEntry::hex("polygon", 137),
        ChainEntry::hex("mumbai", 80001),
        ChainEntry::hex("sepolia", 11_155_111),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_between_tables() {
        let registry = ChainRegistry::with_defaults();
        for chain in registry.snapshot() {
            let by_id = registry
                .lookup_by_numeric_id(chain.numeric_id)
                .expect("seeded id");
            let by_wire = registry.lookup_by_wire_id(&by_id.wire_id).expect("seeded wire");
            assert_eq!(by_id, by_wire);
        }
        assert_eq!(
            registry.lookup_by_wire_id("0x2a").map(|c| c.display_name),
            Some("kovan".to_owned())
        );
    }

    #[test]
    fn overwrite_keeps_tables_one_to_one() {
        let mut registry = ChainRegistry::with_defaults();
        registry.register([ChainEntry::new("kai-decimal", 24, "24")]);

        let chain = registry.lookup_by_numeric_id(24).expect("overwritten");
        assert_eq!(chain.wire_id, "24");
        assert_eq!(chain.display_name, "kai-decimal");
        assert!(registry.lookup_by_wire_id("0x18").is_none());

        registry.register([ChainEntry::new("moved", 25, "24")]);
        assert!(registry.lookup_by_numeric_id(24).is_none());
        assert_eq!(
            registry.lookup_by_wire_id("24").map(|c| c.numeric_id),
            Some(25)
        );
    }

    #[test]
    fn resolve_reported_accepts_hex_and_decimal() {
        let registry = ChainRegistry::with_defaults();
        assert_eq!(registry.resolve_reported("0x5").expect("hex").numeric_id, 5);
        assert_eq!(registry.resolve_reported("0x05").expect("padded").numeric_id, 5);
        assert_eq!(registry.resolve_reported("137").expect("decimal").display_name, "polygon");
        let unknown = registry.resolve_reported("0x7a69").expect("unknown but valid");
        assert_eq!(unknown.numeric_id, 31337);
        assert_eq!(unknown.display_name, "unknown");
        assert!(registry.resolve_reported("mainnet").is_err());
    }

    #[test]
    fn chain_id_from_json_accepts_numbers_and_strings() {
        assert_eq!(chain_id_from_json(&serde_json::json!(56)).expect("number"), 56);
        assert_eq!(chain_id_from_json(&serde_json::json!("0x38")).expect("hex"), 56);
        assert!(chain_id_from_json(&serde_json::json!(null)).is_err());
    }
}
