//! `bag-info.txt` metadata.
//!
//! Keys are stored with their exact case, in insertion order. Writing the
//! same exact key again turns its value into a list. Case-insensitive
//! questions (`has_key(.., true)`, non-repeatable checks) are answered on top
//! of that exact-case storage.

use std::path::Path;

use tracing::debug;

use crate::encoding::TagEncoding;
use crate::error::{BagError, BagResult};
use crate::validation::{ErrorKind, ValidationError};

pub const BAG_INFO_FILE: &str = "bag-info.txt";

/// Fields that may appear at most once (lower-case).
pub const NON_REPEATABLE: &[&str] = &["payload-oxum"];

/// Field names with a meaning defined by the BagIt format (lower-case).
pub const RESERVED_ELEMENTS: &[&str] = &[
    "source-organization",
    "organization-address",
    "contact-name",
    "contact-phone",
    "contact-email",
    "external-description",
    "bagging-date",
    "external-identifier",
    "payload-oxum",
    "bag-size",
    "bag-group-identifier",
    "bag-count",
    "internal-sender-identifier",
    "internal-sender-description",
];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_ELEMENTS.contains(&key.to_ascii_lowercase().as_str())
}

pub fn is_non_repeatable(key: &str) -> bool {
    NON_REPEATABLE.contains(&key.to_ascii_lowercase().as_str())
}

/// One or several values stored under a single exact key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BagInfoValue {
    Single(String),
    Multiple(Vec<String>),
}

impl BagInfoValue {
    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Multiple(vs) => vs,
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.values().first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(vs) => vs.push(value),
        }
    }

    fn continue_last(&mut self, text: &str) {
        let last = match self {
            Self::Single(v) => v,
            Self::Multiple(vs) => match vs.last_mut() {
                Some(v) => v,
                None => return,
            },
        };
        if !last.is_empty() {
            last.push(' ');
        }
        last.push_str(text);
    }
}

/// Ordered key → value(s) store backing `bag-info.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagInfoStore {
    entries: Vec<(String, BagInfoValue)>,
}

impl BagInfoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `Key: value` lines.
    ///
    /// A line starting with a space or tab continues the previous field: its
    /// trimmed text is appended, space-separated, to the last value stored
    /// under that key and under any key that differs from it only in case.
    /// Blank lines and lines without a colon are skipped.
    pub fn parse(text: &str) -> Self {
        let mut store = Self::new();
        let mut previous: Option<String> = None;

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(prev) = &previous {
                    let text = line.trim();
                    for (key, value) in &mut store.entries {
                        if key.eq_ignore_ascii_case(prev) {
                            value.continue_last(text);
                        }
                    }
                }
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            store.accumulate(key, value.trim().to_string());
            previous = Some(key.to_string());
        }

        store
    }

    /// Read `path`. A missing file is an empty store.
    pub fn load(path: &Path, encoding: &TagEncoding) -> BagResult<Self> {
        if !path.is_file() {
            return Ok(Self::new());
        }
        let store = Self::parse(&encoding.read_text(path)?);
        debug!(path = %path.display(), keys = store.len(), "read bag-info");
        Ok(store)
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            for v in value.values() {
                out.push_str(key);
                out.push_str(": ");
                out.push_str(v);
                out.push('\n');
            }
        }
        out
    }

    pub fn write(&self, path: &Path, encoding: &TagEncoding) -> BagResult<()> {
        encoding.write_text(path, &self.serialize())
    }

    /// Store `value` under the exact `key`, turning an existing value into a list.
    ///
    /// Fails without changing anything if `key` names a non-repeatable field
    /// and the exact key already holds a value. A different-case spelling of
    /// the same field is accepted here and reported by
    /// [`validate_non_repeatable`](Self::validate_non_repeatable).
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) -> BagResult<()> {
        if is_non_repeatable(key) && self.has_key(key, false) {
            return Err(BagError::DuplicateNonRepeatableField {
                key: key.to_string(),
            });
        }
        self.accumulate(key, value.into());
        Ok(())
    }

    fn accumulate(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => existing.push(value),
            None => self
                .entries
                .push((key.to_string(), BagInfoValue::Single(value))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&BagInfoValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn has_key(&self, key: &str, case_insensitive: bool) -> bool {
        if case_insensitive {
            self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
        } else {
            self.get(key).is_some()
        }
    }

    /// Remove the exact `key`.
    pub fn remove(&mut self, key: &str) -> Option<BagInfoValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BagInfoValue)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record one error per non-repeatable field that is stored under more
    /// than one exact-case key.
    ///
    /// Repeats under the identical key are not counted; only distinct
    /// spellings are.
    pub fn validate_non_repeatable(
        &self,
        location: &str,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let before = errors.len();
        for name in NON_REPEATABLE {
            let count = self
                .entries
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                .count();
            if count > 1 {
                errors.push(ValidationError::new(
                    ErrorKind::Metadata,
                    location,
                    format!("cannot contain more than one of tag {name}, {count} found"),
                ));
            }
        }
        before == errors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accumulates_exact_duplicates_into_list() {
        let store = BagInfoStore::parse("Contact-Name: Ann\nContact-Name: Bob\nContact-Name: Cy\n");
        assert_eq!(
            store.get("Contact-Name"),
            Some(&BagInfoValue::Multiple(vec![
                "Ann".into(),
                "Bob".into(),
                "Cy".into()
            ]))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn parse_joins_continuation_lines() {
        let text = "External-Description: A long\n  description that\n\twraps.\nBag-Count: 1 of 2\n";
        let store = BagInfoStore::parse(text);
        assert_eq!(
            store.get("External-Description").and_then(|v| v.first()),
            Some("A long description that wraps.")
        );
        assert_eq!(store.get("Bag-Count").and_then(|v| v.first()), Some("1 of 2"));
    }

    #[test]
    fn continuation_applies_to_case_variant_aliases() {
        let text = "note: one\nNOTE: two\n  more\n";
        let store = BagInfoStore::parse(text);
        assert_eq!(store.get("note").and_then(|v| v.first()), Some("one more"));
        assert_eq!(store.get("NOTE").and_then(|v| v.first()), Some("two more"));
    }

    #[test]
    fn continuation_extends_last_list_element() {
        let store = BagInfoStore::parse("K: a\nK: b\n  c\n");
        assert_eq!(
            store.get("K"),
            Some(&BagInfoValue::Multiple(vec!["a".into(), "b c".into()]))
        );
    }

    #[test]
    fn serialize_repeats_key_per_value_in_order() {
        let mut store = BagInfoStore::new();
        store.set_value("Source-Organization", "Lab").unwrap();
        store.set_value("Contact-Email", "a@x").unwrap();
        store.set_value("Contact-Email", "b@x").unwrap();
        assert_eq!(
            store.serialize(),
            "Source-Organization: Lab\nContact-Email: a@x\nContact-Email: b@x\n"
        );
        assert_eq!(BagInfoStore::parse(&store.serialize()), store);
    }

    #[test]
    fn non_repeatable_same_key_is_refused_without_change() {
        let mut store = BagInfoStore::new();
        store.set_value("Payload-Oxum", "10.1").unwrap();
        let err = store.set_value("Payload-Oxum", "20.2").unwrap_err();
        assert!(matches!(err, BagError::DuplicateNonRepeatableField { .. }));
        assert_eq!(store.get("Payload-Oxum"), Some(&BagInfoValue::Single("10.1".into())));
    }

    #[test]
    fn non_repeatable_cross_case_is_accepted_then_reported_once() {
        let mut store = BagInfoStore::new();
        store.set_value("Payload-Oxum", "10.1").unwrap();
        store.set_value("PAYLOAD-OXUM", "20.2").unwrap();

        let mut errors = Vec::new();
        assert!(!store.validate_non_repeatable("/bag/bag-info.txt", &mut errors));
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].as_pair(),
            (
                "/bag/bag-info.txt",
                "cannot contain more than one of tag payload-oxum, 2 found"
            )
        );
    }

    #[test]
    fn parsed_repeat_under_identical_key_is_not_reported() {
        let store = BagInfoStore::parse("Payload-Oxum: 1.1\nPayload-Oxum: 2.2\n");
        let mut errors = Vec::new();
        assert!(store.validate_non_repeatable("bag-info.txt", &mut errors));
        assert!(errors.is_empty());
    }

    #[test]
    fn non_repeatable_count_is_distinct_spellings() {
        let store = BagInfoStore::parse("Payload-Oxum: 1\nPayload-Oxum: 2\nPAYLOAD-OXUM: 3\n");
        let mut errors = Vec::new();
        store.validate_non_repeatable("bag-info.txt", &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Metadata);
        assert_eq!(
            errors[0].message,
            "cannot contain more than one of tag payload-oxum, 2 found"
        );
    }

    #[test]
    fn lookups_remove_and_clear() {
        let mut store = BagInfoStore::parse("Bagging-Date: 2024-01-01\nX-Custom: y\n");
        assert!(store.has_key("bagging-date", true));
        assert!(!store.has_key("bagging-date", false));
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["Bagging-Date", "X-Custom"]);

        assert!(store.remove("X-Custom").is_some());
        assert!(store.remove("X-Custom").is_none());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn reserved_elements_are_case_insensitive() {
        assert!(is_reserved("Payload-Oxum"));
        assert!(is_reserved("BAG-SIZE"));
        assert!(!is_reserved("X-Custom"));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(BAG_INFO_FILE);
        let store = BagInfoStore::load(&path, &TagEncoding::utf8()).unwrap();
        assert!(store.is_empty());
    }
}
