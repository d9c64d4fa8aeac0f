//! Metadata records describing which files a loader read and the shapes it found.
//!
//! Each loader returns a fresh [`MetaData`] fragment. Callers that combine several loaders
//! merge the fragments with [`MetaData::merge`]. The keys follow a fixed naming scheme, e.g.,
//! `lh.num_vertices` or `rh.morphometry_file`, so merged per-hemisphere data can later be
//! split again.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::hemi::Hemisphere;


/// A single metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Path(PathBuf),
    Null,
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetaValue::Str(s) => write!(f, "{}", s),
            MetaValue::Int(i) => write!(f, "{}", i),
            MetaValue::Float(v) => write!(f, "{}", v),
            MetaValue::Bool(b) => write!(f, "{}", b),
            MetaValue::Path(p) => write!(f, "{}", p.display()),
            MetaValue::Null => write!(f, "None"),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> MetaValue {
        MetaValue::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> MetaValue {
        MetaValue::Str(s)
    }
}

impl From<usize> for MetaValue {
    fn from(v: usize) -> MetaValue {
        MetaValue::Int(v as i64)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> MetaValue {
        MetaValue::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> MetaValue {
        MetaValue::Float(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> MetaValue {
        MetaValue::Bool(v)
    }
}

impl From<PathBuf> for MetaValue {
    fn from(p: PathBuf) -> MetaValue {
        MetaValue::Path(p)
    }
}

impl From<&Path> for MetaValue {
    fn from(p: &Path) -> MetaValue {
        MetaValue::Path(p.to_path_buf())
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(v: Option<T>) -> MetaValue {
        match v {
            Some(v) => v.into(),
            None => MetaValue::Null,
        }
    }
}


/// An ordered key/value record of facts collected while loading data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaData {
    entries: BTreeMap<String, MetaValue>,
}

impl MetaData {
    pub fn new() -> MetaData {
        MetaData::default()
    }

    /// Builder-style insertion.
    pub fn with<K: Into<String>, V: Into<MetaValue>>(mut self, key: K, value: V) -> MetaData {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>, V: Into<MetaValue>>(&mut self, key: K, value: V) {
        self.entries.insert(key.into(), value.into());
    }

    /// Insert a value under the hemisphere-prefixed key, e.g., `lh.num_vertices`.
    pub fn insert_hemi<V: Into<MetaValue>>(&mut self, hemi: Hemisphere, key: &str, value: V) {
        self.insert(hemi_key(hemi, key), value);
    }

    /// Merge another fragment into this one. Entries of `other` win on key collisions.
    pub fn merge(&mut self, other: MetaData) {
        self.entries.extend(other.entries);
    }

    /// Consuming variant of [`MetaData::merge`].
    pub fn merged(mut self, other: MetaData) -> MetaData {
        self.merge(other);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(MetaValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(MetaValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(MetaValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_path(&self, key: &str) -> Option<&Path> {
        match self.entries.get(key) {
            Some(MetaValue::Path(p)) => Some(p.as_path()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetaValue)> {
        self.entries.iter()
    }
}

/// Build a hemisphere-prefixed metadata key like `rh.surf_file`.
pub fn hemi_key(hemi: Hemisphere, key: &str) -> String {
    format!("{}.{}", hemi, key)
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fragments_are_merged_with_later_entries_winning() {
        let mut md = MetaData::new().with("subject_id", "subject1").with("surf", "white");
        let fragment = MetaData::new().with("surf", "pial").with("lh.num_vertices", 5usize);
        md.merge(fragment);

        assert_eq!(3, md.len());
        assert_eq!(Some("pial"), md.get_str("surf"));
        assert_eq!(Some(5), md.get_int("lh.num_vertices"));
    }

    #[test]
    fn hemi_keys_are_prefixed() {
        let mut md = MetaData::new();
        md.insert_hemi(Hemisphere::Rh, "num_faces", 12usize);
        assert!(md.contains_key("rh.num_faces"));
        assert_eq!(None, md.get_str("rh.num_faces"));
    }

    #[test]
    fn missing_optional_values_become_null() {
        let md = MetaData::new().with("measure", None::<String>);
        assert_eq!(Some(&MetaValue::Null), md.get("measure"));
    }
}
