use serde::{Deserialize, Serialize};

use stockpile_core::{StoreError, StoreResult};
use stockpile_items::{Item, ItemDraft, Modifier};

/// Property keys an inventory stamps on the items it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Int property mirroring the item's stack count.
    pub count_key: String,
    /// Int property holding the raw id of the inventory the item sits in, or
    /// 0 when it sits in none.
    pub inventory_key: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            count_key: "count".to_string(),
            inventory_key: "inventory".to_string(),
        }
    }
}

impl InventoryConfig {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StoreError::configuration(format!("invalid inventory config: {e}")))?;
        if config.count_key.is_empty() || config.inventory_key.is_empty() {
            return Err(StoreError::configuration("inventory property keys cannot be empty"));
        }
        if config.count_key == config.inventory_key {
            return Err(StoreError::configuration(format!(
                "count and inventory keys are both '{}'",
                config.count_key
            )));
        }
        Ok(config)
    }

    /// Stamps a zero instance count on every new item that lacks one.
    pub fn count_modifier(&self) -> CountModifier {
        CountModifier {
            key: self.count_key.clone(),
        }
    }
}

/// Creation-time modifier giving every item an instance count.
#[derive(Debug, Clone)]
pub struct CountModifier {
    key: String,
}

impl Modifier for CountModifier {
    fn is_valid(&self, item: &Item) -> bool {
        !item.contains_key(&self.key)
    }

    fn apply(&self, item: &mut ItemDraft<'_>) {
        item.set(self.key.as_str(), 0i64);
    }

    fn name(&self) -> &str {
        "instance-count"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_items::ItemStore;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = InventoryConfig::from_json(r#"{ "count_key": "amount" }"#).unwrap();
        assert_eq!(config.count_key, "amount");
        assert_eq!(config.inventory_key, "inventory");
        assert_eq!(InventoryConfig::from_json("{}").unwrap(), InventoryConfig::default());
    }

    #[test]
    fn clashing_or_empty_keys_are_rejected() {
        assert!(InventoryConfig::from_json(r#"{ "count_key": "" }"#).is_err());
        assert!(InventoryConfig::from_json(r#"{ "count_key": "inventory" }"#).is_err());
        assert!(InventoryConfig::from_json("not json").is_err());
    }

    #[test]
    fn count_modifier_stamps_zero_unless_initialized() {
        let config = InventoryConfig::default();
        let mut store = ItemStore::new().with_modifier(config.count_modifier());

        let blank = store.create();
        let preset = store.create_with(|item| {
            item.set("count", 7);
        });

        assert_eq!(store.first(blank).unwrap().value::<i64>("count"), Some(0));
        assert_eq!(store.first(preset).unwrap().value::<i64>("count"), Some(7));
    }
}
