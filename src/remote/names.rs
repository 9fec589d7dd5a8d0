//! Identifier <-> remote name tables

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use tracing::debug;

/// Bidirectional mapping between identifiers and the OBS names they stand for
///
/// Tables are only ever replaced as a whole: [`NameTable::rebuild`] builds the
/// new maps first and swaps them in, so a reader never sees a half-cleared
/// table.
#[derive(Debug, Clone)]
pub struct NameTable<K> {
    kind: &'static str,
    by_id: BTreeMap<K, String>,
    by_name: HashMap<String, K>,
}

impl<K> NameTable<K>
where
    K: Ord + Copy + Display,
{
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            by_id: BTreeMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Replace the table with every name that `decode` accepts
    ///
    /// When two names decode to the same identifier the later one owns it.
    pub fn rebuild<I, S, F>(&mut self, names: I, decode: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str) -> Option<K>,
    {
        let mut by_id = BTreeMap::new();
        let mut by_name = HashMap::new();

        for name in names {
            let name = name.into();
            let Some(id) = decode(&name) else {
                continue;
            };
            debug!("{} registered: {} -> '{}'", self.kind, id, name);
            if let Some(replaced) = by_id.insert(id, name.clone()) {
                by_name.remove(&replaced);
            }
            by_name.insert(name, id);
        }

        self.by_id = by_id;
        self.by_name = by_name;
    }

    pub fn name_of(&self, id: &K) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn id_of(&self, name: &str) -> Option<K> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, id: &K) -> bool {
        self.by_id.contains_key(id)
    }

    /// Registered identifiers in ascending order
    pub fn ids(&self) -> Vec<K> {
        self.by_id.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
