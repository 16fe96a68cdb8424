//! Extra-field side store
//!
//! Per-address overlay for vertical rate, squawk and category. Entries age
//! out on their own timer, independently of the registry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::{DecodedMessage, TransponderAddress};

/// Overlay fields for one aircraft
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraFields {
    pub vertical_rate_fpm: Option<i32>,
    pub squawk: Option<String>,
    pub category: Option<String>,
}

impl ExtraFields {
    pub fn is_empty(&self) -> bool {
        self.vertical_rate_fpm.is_none() && self.squawk.is_none() && self.category.is_none()
    }
}

impl From<&DecodedMessage> for ExtraFields {
    fn from(msg: &DecodedMessage) -> Self {
        Self {
            vertical_rate_fpm: msg.vertical_rate_fpm,
            squawk: msg.squawk.clone(),
            category: msg.category.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct ExtraFieldEntry {
    fields: ExtraFields,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct ExtraFieldStore {
    entries: HashMap<TransponderAddress, ExtraFieldEntry>,
    timeout: Duration,
}

impl ExtraFieldStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            timeout,
        }
    }

    /// Create or refresh the entry, overwriting only the fields present in `fields`
    pub fn upsert(&mut self, address: TransponderAddress, fields: ExtraFields, now: Instant) {
        let entry = self.entries.entry(address).or_insert_with(|| ExtraFieldEntry {
            fields: ExtraFields::default(),
            last_seen: now,
        });
        entry.last_seen = now;

        if fields.vertical_rate_fpm.is_some() {
            entry.fields.vertical_rate_fpm = fields.vertical_rate_fpm;
        }
        if fields.squawk.is_some() {
            entry.fields.squawk = fields.squawk;
        }
        if fields.category.is_some() {
            entry.fields.category = fields.category;
        }
    }

    /// Current overlay, or an empty one
    pub fn get(&self, address: TransponderAddress) -> ExtraFields {
        self.entries
            .get(&address)
            .map(|entry| entry.fields.clone())
            .unwrap_or_default()
    }

    /// Remove entries not refreshed within the staleness window
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let timeout = self.timeout;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= timeout);
        before - self.entries.len()
    }

    pub fn remove(&mut self, address: TransponderAddress) {
        self.entries.remove(&address);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: TransponderAddress = TransponderAddress::new(0x3C6586);

    #[test]
    fn test_partial_update_keeps_untouched_fields() {
        let now = Instant::now();
        let mut store = ExtraFieldStore::new(Duration::from_secs(60));

        store.upsert(
            ADDR,
            ExtraFields {
                vertical_rate_fpm: Some(-640),
                squawk: Some("1000".into()),
                category: None,
            },
            now,
        );
        store.upsert(
            ADDR,
            ExtraFields {
                category: Some("A3".into()),
                ..Default::default()
            },
            now,
        );

        let fields = store.get(ADDR);
        assert_eq!(fields.vertical_rate_fpm, Some(-640));
        assert_eq!(fields.squawk.as_deref(), Some("1000"));
        assert_eq!(fields.category.as_deref(), Some("A3"));
    }

    #[test]
    fn test_get_unknown_is_empty() {
        let store = ExtraFieldStore::new(Duration::from_secs(60));
        assert!(store.get(ADDR).is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let now = Instant::now();
        let mut store = ExtraFieldStore::new(Duration::from_secs(60));
        let other = TransponderAddress::new(0x4840D6);
        let fields = ExtraFields {
            squawk: Some("7000".into()),
            ..Default::default()
        };

        store.upsert(ADDR, fields.clone(), now);
        store.upsert(other, fields, now + Duration::from_secs(30));

        assert_eq!(store.sweep(now + Duration::from_secs(60)), 0);
        assert_eq!(store.sweep(now + Duration::from_secs(61)), 1);
        assert!(store.get(ADDR).is_empty());
        assert_eq!(store.get(other).squawk.as_deref(), Some("7000"));
    }

    #[test]
    fn test_upsert_refreshes_last_seen() {
        let now = Instant::now();
        let mut store = ExtraFieldStore::new(Duration::from_secs(60));
        store.upsert(ADDR, ExtraFields { vertical_rate_fpm: Some(0), ..Default::default() }, now);
        store.upsert(ADDR, ExtraFields::default(), now + Duration::from_secs(50));

        assert_eq!(store.sweep(now + Duration::from_secs(100)), 0);
        assert_eq!(store.len(), 1);
    }
}
