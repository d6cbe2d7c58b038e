// Key/value storage abstraction

use eyre::{Result, eyre};
use std::collections::HashMap;

/// Local key/value storage holding one serialized value per key
///
/// Implementations must overwrite a key's value atomically: a reader sees either
/// the old value or the new one, never a mix.
pub trait KeyValueStore {
    /// Read the value at `key`, or `None` if it has never been written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value at `key`
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store, nothing survives the process
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    values: HashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Box<K> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Validate a storage key
///
/// Keys double as file names for `FileKv`, so they are restricted to a safe set.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 128 {
        return Err(eyre!("Storage key too long: {} chars (max 128)", key.len()));
    }
    if key.starts_with('.') {
        return Err(eyre!("Invalid storage key: {} (cannot start with '.')", key));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(eyre!(
            "Invalid storage key: {} (must be alphanumeric with _/-/.)",
            key
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_kv_roundtrip() {
        let mut kv = MemoryKv::new();
        assert_eq!(kv.get("items").unwrap(), None);

        kv.set("items", "[]").unwrap();
        assert_eq!(kv.get("items").unwrap().as_deref(), Some("[]"));

        kv.set("items", "[1]").unwrap();
        assert_eq!(kv.get("items").unwrap().as_deref(), Some("[1]"));
        assert_eq!(kv.get("other").unwrap(), None);
    }

    #[test]
    fn test_boxed_kv_delegates() {
        let mut kv: Box<dyn KeyValueStore> = Box::new(MemoryKv::new());
        kv.set("k", "v").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("todo-bloom-items").is_ok());
        assert!(validate_key("todos_v2.backup").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(&"a".repeat(129)).is_err());
    }
}
