//! The params store: an append-only ledger of named, typed values.
//!
//! One [`Slots`] table holds document-scope fields and one more per page
//! holds page-scope fields. Every slot records the stage that produced it
//! and a sequence number; a field is written at most once.

use crate::error::{Error, Result};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Producer name recorded for the fields seeded before any stage runs.
pub const SEED_PRODUCER: &str = "seed";

#[derive(Clone)]
struct Slot {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    producer: &'static str,
    sequence: u64,
}

/// One table of named slots.
#[derive(Clone, Default)]
pub struct Slots {
    slots: BTreeMap<&'static str, Slot>,
    next_sequence: u64,
}

impl Slots {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a field, cloning the stored value.
    pub fn get<T: Clone + 'static>(&self, name: &str) -> Result<T> {
        self.get_ref::<T>(name).cloned()
    }

    /// Borrow a field.
    pub fn get_ref<T: 'static>(&self, name: &str) -> Result<&T> {
        let slot = self
            .slots
            .get(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        slot.value
            .downcast_ref::<T>()
            .ok_or_else(|| Error::FieldTypeMismatch {
                field: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                found: slot.type_name.to_string(),
            })
    }

    /// Write a field. Fails if the field already holds a value.
    pub fn insert<T: Send + Sync + 'static>(
        &mut self,
        name: &'static str,
        value: T,
        producer: &'static str,
    ) -> Result<()> {
        if let Some(existing) = self.slots.get(name) {
            return Err(Error::DuplicateField {
                stage: producer.to_string(),
                field: name.to_string(),
                producer: existing.producer.to_string(),
            });
        }
        self.slots.insert(
            name,
            Slot {
                value: Arc::new(value),
                type_name: std::any::type_name::<T>(),
                producer,
                sequence: self.next_sequence,
            },
        );
        self.next_sequence += 1;
        Ok(())
    }

    /// Check if a field has been written.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Stage that produced a field.
    pub fn producer(&self, name: &str) -> Option<&'static str> {
        self.slots.get(name).map(|s| s.producer)
    }

    /// Write order of a field within this table.
    pub fn sequence(&self, name: &str) -> Option<u64> {
        self.slots.get(name).map(|s| s.sequence)
    }

    /// Field names in write order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<(&'static str, u64)> =
            self.slots.iter().map(|(n, s)| (*n, s.sequence)).collect();
        names.sort_by_key(|(_, seq)| *seq);
        names.into_iter().map(|(n, _)| n).collect()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for Slots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(n, s)| (n, s.type_name)))
            .finish()
    }
}

/// Document-scope and per-page fields of one pipeline run.
#[derive(Debug, Clone)]
pub struct ParamsStore {
    doc: Slots,
    pages: Vec<Slots>,
}

impl ParamsStore {
    /// Create a store for a document of `page_count` pages.
    ///
    /// The `page_count` document field is seeded.
    pub fn new(page_count: usize) -> Result<Self> {
        let mut doc = Slots::new();
        doc.insert("page_count", page_count, SEED_PRODUCER)?;
        Ok(Self {
            doc,
            pages: vec![Slots::new(); page_count],
        })
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Document-scope table.
    pub fn doc(&self) -> &Slots {
        &self.doc
    }

    /// Mutable document-scope table.
    pub fn doc_mut(&mut self) -> &mut Slots {
        &mut self.doc
    }

    /// Page-scope table of page `index`.
    pub fn page(&self, index: usize) -> Result<&Slots> {
        let count = self.pages.len();
        self.pages
            .get(index)
            .ok_or(Error::PageIndexOutOfRange(index, count))
    }

    /// Mutable page-scope table of page `index`.
    pub fn page_mut(&mut self, index: usize) -> Result<&mut Slots> {
        let count = self.pages.len();
        self.pages
            .get_mut(index)
            .ok_or(Error::PageIndexOutOfRange(index, count))
    }

    /// Read a document field.
    pub fn doc_get<T: Clone + 'static>(&self, name: &str) -> Result<T> {
        self.doc.get(name)
    }

    /// Write a document field.
    pub fn doc_set<T: Send + Sync + 'static>(
        &mut self,
        name: &'static str,
        value: T,
        producer: &'static str,
    ) -> Result<()> {
        self.doc.insert(name, value, producer)
    }

    /// Read a page field.
    pub fn page_get<T: Clone + 'static>(&self, name: &str, index: usize) -> Result<T> {
        self.page(index)?.get(name)
    }

    /// Write a page field.
    pub fn page_set<T: Send + Sync + 'static>(
        &mut self,
        name: &'static str,
        index: usize,
        value: T,
        producer: &'static str,
    ) -> Result<()> {
        self.page_mut(index)?.insert(name, value, producer)
    }
}
