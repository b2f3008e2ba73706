use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Interned string constants, keyed densely in first-seen order.
///
/// Code refers to strings by key; the table travels with the code into the
/// VM, which may append strings read at run time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringTable {
    strings: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, i64>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the key of `s`, adding it when it is new.
    pub fn intern(&mut self, s: &str) -> i64 {
        if let Some(&key) = self.index.get(s) {
            return key;
        }
        let key = self.strings.len() as i64;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), key);
        key
    }

    pub fn get(&self, key: i64) -> Option<&str> {
        usize::try_from(key)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (i as i64, s.as_str()))
    }

    /// Rebuilds the lookup index after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .strings
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as i64))
            .collect();
    }
}

impl FromIterator<String> for StringTable {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut table = StringTable::new();
        for s in iter {
            table.intern(&s);
        }
        table
    }
}
