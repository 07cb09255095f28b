use std::collections::HashMap;

/// Assigns stable, insertion-ordered indices to registry entries, the same
/// way the vanilla registry sync does: the first identifier registered under
/// a registry gets index 0, the next gets 1, and so on. Indices are used by
/// later packets (e.g. Player Chat Message's chat type, a painting's variant)
/// to reference an entry without repeating its identifier string.
#[derive(Debug, Default)]
pub struct RegistryManager {
    registries: HashMap<String, RegistryTable>,
}

#[derive(Debug, Default)]
struct RegistryTable {
    by_identifier: HashMap<String, i32>,
    order: Vec<String>,
}

impl RegistryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `identifier` under `registry` if not already present, and
    /// returns its index either way.
    pub fn add_entry(&mut self, registry: &str, identifier: &str) -> i32 {
        let table = self.registries.entry(registry.to_string()).or_default();
        if let Some(&idx) = table.by_identifier.get(identifier) {
            return idx;
        }
        let idx = table.order.len() as i32;
        table.order.push(identifier.to_string());
        table.by_identifier.insert(identifier.to_string(), idx);
        idx
    }

    pub fn get_registry_id(&self, registry: &str, identifier: &str) -> Option<i32> {
        self.registries.get(registry)?.by_identifier.get(identifier).copied()
    }

    pub fn entries(&self, registry: &str) -> &[String] {
        self.registries
            .get(registry)
            .map(|t| t.order.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut mgr = RegistryManager::new();
        assert_eq!(mgr.add_entry("minecraft:chat_type", "minecraft:chat"), 0);
        assert_eq!(mgr.add_entry("minecraft:chat_type", "minecraft:system"), 1);
        assert_eq!(mgr.add_entry("minecraft:chat_type", "minecraft:chat"), 0);
        assert_eq!(mgr.get_registry_id("minecraft:chat_type", "minecraft:system"), Some(1));
    }

    #[test]
    fn test_unknown_identifier_returns_none() {
        let mgr = RegistryManager::new();
        assert_eq!(mgr.get_registry_id("minecraft:chat_type", "minecraft:missing"), None);
    }
}
