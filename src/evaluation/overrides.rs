use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Administrative forcing values, process scoped and never persisted.
#[derive(Debug, Default)]
pub struct OverrideSet {
    values: RwLock<HashMap<String, bool>>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, flag_key: &str) -> Option<bool> {
        self.values.read().get(flag_key).copied()
    }

    /// Returns the previous value, if any.
    pub fn set(&self, flag_key: &str, value: bool) -> Option<bool> {
        self.values.write().insert(flag_key.to_string(), value)
    }

    pub fn remove(&self, flag_key: &str) -> Option<bool> {
        self.values.write().remove(flag_key)
    }

    pub fn clear(&self) {
        self.values.write().clear();
    }

    pub fn contains(&self, flag_key: &str) -> bool {
        self.values.read().contains_key(flag_key)
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Sorted copy of the current overrides.
    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        self.values
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replace_remove_clear() {
        let overrides = OverrideSet::new();
        assert!(overrides.is_empty());

        assert_eq!(overrides.set("a", true), None);
        assert_eq!(overrides.set("a", false), Some(true));
        overrides.set("b", true);
        assert_eq!(overrides.get("a"), Some(false));
        assert_eq!(overrides.len(), 2);

        assert_eq!(overrides.remove("a"), Some(false));
        assert!(!overrides.contains("a"));

        overrides.clear();
        assert!(overrides.snapshot().is_empty());
    }
}
