//! # Status Dictionary
//!
//! Immutable lookup from a provider status to the internal identifiers it maps
//! to. The key is the lowercase concatenation of the provider status code, the
//! provider status name and the delivery-service identifier, with no
//! separators. The same derivation is used when building and when looking up,
//! so provider payloads may use any letter case.
//!
//! ```rust
//! use status_reconciler::dictionary::{dictionary_key, StatusDictionary};
//! use status_reconciler::models::MappingRow;
//!
//! let rows = vec![MappingRow {
//!     id: 9,
//!     status_id: 2,
//!     delivery_service_status_code: "Delivered".to_string(),
//!     delivery_service_status_name: "123".to_string(),
//!     delivery_service_id: "dsA".to_string(),
//! }];
//!
//! let dictionary = StatusDictionary::build(rows).unwrap();
//! let ids = dictionary.get(&dictionary_key("DELIVERED", "123", "DSA")).unwrap();
//! assert_eq!(ids.delivery_service_status_id, 9);
//! assert_eq!(ids.status_id, 2);
//! ```

use crate::models::MappingRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Identifier pair a provider status maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusIds {
    /// Provider-status identifier (mapping row id)
    pub delivery_service_status_id: i64,
    /// Canonical status identifier
    pub status_id: i64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DictionaryBuildError {
    #[error("Duplicate status mapping key '{key}' (rows {existing_row_id} and {duplicate_row_id})")]
    DuplicateKey {
        key: String,
        existing_row_id: i64,
        duplicate_row_id: i64,
    },
    #[error("Status mapping table is empty")]
    Empty,
}

/// Derive the lookup key for a provider status.
pub fn dictionary_key(status_code: &str, status_name: &str, delivery_service_id: &str) -> String {
    let mut key =
        String::with_capacity(status_code.len() + status_name.len() + delivery_service_id.len());
    key.push_str(status_code);
    key.push_str(status_name);
    key.push_str(delivery_service_id);
    key.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDictionary {
    entries: HashMap<String, StatusIds>,
}

impl StatusDictionary {
    /// Build the dictionary from mapping rows.
    ///
    /// Fails on the first key collision instead of letting a later row shadow
    /// an earlier one, and fails when there are no rows at all.
    pub fn build<I>(rows: I) -> Result<Self, DictionaryBuildError>
    where
        I: IntoIterator<Item = MappingRow>,
    {
        let mut entries: HashMap<String, StatusIds> = HashMap::new();
        let mut row_ids: HashMap<String, i64> = HashMap::new();

        for row in rows {
            let key = dictionary_key(
                &row.delivery_service_status_code,
                &row.delivery_service_status_name,
                &row.delivery_service_id,
            );

            if let Some(existing_row_id) = row_ids.get(&key) {
                return Err(DictionaryBuildError::DuplicateKey {
                    key,
                    existing_row_id: *existing_row_id,
                    duplicate_row_id: row.id,
                });
            }

            row_ids.insert(key.clone(), row.id);
            entries.insert(
                key,
                StatusIds {
                    delivery_service_status_id: row.id,
                    status_id: row.status_id,
                },
            );
        }

        if entries.is_empty() {
            return Err(DictionaryBuildError::Empty);
        }

        Ok(Self { entries })
    }

    /// Look up a key; the key is lowercased before the lookup.
    pub fn get(&self, key: &str) -> Option<StatusIds> {
        self.entries.get(&key.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
