//! Ordered datasets addressable by name.
use std::collections::HashMap;

use crate::{
    dataset::data::Dataset,
    spectrum::{
        errors::{SpecError, SpecResult},
        function::SpecFunction,
    },
};

/// A dataset with its own energy-scale correction, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetEntry {
    pub dataset: Dataset,
    pub correction: Option<SpecFunction>,
}

/// Datasets in registration order with a name index.
#[derive(Debug, Clone, Default)]
pub struct DatasetCollection {
    entries: Vec<DatasetEntry>,
    index: HashMap<String, usize>,
}

impl DatasetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its position.
    ///
    /// # Errors
    /// `SpecError::DuplicateDataset` if the name is taken.
    pub fn insert(&mut self, entry: DatasetEntry) -> SpecResult<usize> {
        let name = entry.dataset.name().to_string();
        if self.index.contains_key(&name) {
            return Err(SpecError::DuplicateDataset { name });
        }
        let position = self.entries.len();
        self.index.insert(name, position);
        self.entries.push(entry);
        Ok(position)
    }

    pub fn get(&self, name: &str) -> Option<&DatasetEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DatasetEntry> {
        let i = *self.index.get(name)?;
        self.entries.get_mut(i)
    }

    pub fn at(&self, i: usize) -> Option<&DatasetEntry> {
        self.entries.get(i)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DatasetEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, DatasetEntry> {
        self.entries.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.dataset.name())
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

    fn entry(name: &str) -> DatasetEntry {
        let ds = Dataset::new(name, "", vec![19.0], vec![0.05], vec![1.0], vec![1.0]).unwrap();
        DatasetEntry { dataset: ds, correction: None }
    }

    #[test]
    // Purpose
    // -------
    // Names are unique and lookups agree with insertion order.
    //
    // Given
    // -----
    // - "TA", "Auger", then "TA" again.
    //
    // Expect
    // ------
    // - Positions 0 and 1; the duplicate is rejected and nothing is added.
    fn insert_and_lookup() {
        let mut c = DatasetCollection::new();
        assert_eq!(c.insert(entry("TA")).unwrap(), 0);
        assert_eq!(c.insert(entry("Auger")).unwrap(), 1);
        assert_eq!(
            c.insert(entry("TA")).unwrap_err(),
            SpecError::DuplicateDataset { name: "TA".to_string() }
        );
        assert_eq!(c.len(), 2);
        assert_eq!(c.index_of("Auger"), Some(1));
        assert_eq!(c.at(0).map(|e| e.dataset.name()), Some("TA"));
        assert!(c.get("HiRes").is_none());
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["TA", "Auger"]);
    }
}
