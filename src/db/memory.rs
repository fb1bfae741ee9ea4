// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local document store.
//!
//! Mirrors the subset of Firestore behaviour the application relies on:
//! documents are JSON objects addressed by (collection, id), writes replace
//! the whole document, and equality filters match on top-level fields.

use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// In-memory collections of JSON documents.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Map<String, Value>>>,
    indexes: DashMap<String, BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Map<String, Value>> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    pub fn put(&self, collection: &str, id: &str, doc: Map<String, Value>) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
    }

    pub fn delete(&self, collection: &str, id: &str) {
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
    }

    /// All documents in a collection, ordered by document ID.
    pub fn list(&self, collection: &str) -> Vec<(String, Map<String, Value>)> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Documents whose top-level `field` equals `value`.
    ///
    /// Numbers and booleans compare by their string form, matching how
    /// identifiers are passed around as strings.
    pub fn filter_eq(&self, collection: &str, field: &str, value: &str) -> Vec<Map<String, Value>> {
        self.list(collection)
            .into_iter()
            .filter(|(_, doc)| match doc.get(field) {
                Some(Value::String(s)) => s == value,
                Some(Value::Number(n)) => n.to_string() == value,
                Some(Value::Bool(b)) => b.to_string() == value,
                _ => false,
            })
            .map(|(_, doc)| doc)
            .collect()
    }

    pub fn ensure_index(&self, collection: &str, field: &str) {
        self.indexes
            .entry(collection.to_string())
            .or_default()
            .insert(field.to_string());
    }

    pub fn drop_index(&self, collection: &str, field: &str) {
        if let Some(mut fields) = self.indexes.get_mut(collection) {
            fields.remove(field);
        }
    }

    pub fn indexes(&self, collection: &str) -> Vec<String> {
        self.indexes
            .get(collection)
            .map(|fields| fields.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        store.put("accounts", "0x1", doc(json!({"address": "0x1"})));

        assert_eq!(store.get("accounts", "0x1").unwrap()["address"], "0x1");
        store.delete("accounts", "0x1");
        assert!(store.get("accounts", "0x1").is_none());
        assert!(store.get("missing", "0x1").is_none());
    }

    #[test]
    fn test_filter_eq_strings_and_numbers() {
        let store = MemoryStore::new();
        store.put("c", "a", doc(json!({"state": "queued", "n": 5})));
        store.put("c", "b", doc(json!({"state": "done", "n": 6})));

        assert_eq!(store.filter_eq("c", "state", "queued").len(), 1);
        assert_eq!(store.filter_eq("c", "n", "6").len(), 1);
        assert!(store.filter_eq("c", "other", "x").is_empty());
    }

    #[test]
    fn test_indexes() {
        let store = MemoryStore::new();
        store.ensure_index("activities", "payoutState");
        store.ensure_index("activities", "payoutState");
        assert_eq!(store.indexes("activities"), vec!["payoutState"]);

        store.drop_index("activities", "payoutState");
        assert!(store.indexes("activities").is_empty());
    }
}
