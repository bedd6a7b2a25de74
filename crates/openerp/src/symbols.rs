//! Referential checks over the XML ids in a document.
//!
//! The loader resolves `ref` values by id string, so a typo only shows up at import time.
//! [`SymbolTable`] records which ids a document defines and which it references, so callers
//! can check references against the document itself plus the ids they know exist elsewhere
//! (other data files, base module data).

use crate::document::RecordBlock;
use std::collections::{BTreeMap, BTreeSet};

/// A reference that could not be resolved, or that points forward in the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DanglingReference {
    pub record_id: String,
    pub field: String,
    pub target: String,
}

#[derive(Clone, Debug)]
struct Reference {
    position: usize,
    record_id: String,
    field: String,
    target: String,
}

impl Reference {
    fn to_dangling(&self) -> DanglingReference {
        DanglingReference {
            record_id: self.record_id.clone(),
            field: self.field.clone(),
            target: self.target.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    /// id -> position of the first record defining it
    defined: BTreeMap<String, usize>,
    references: Vec<Reference>,
}

impl SymbolTable {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a RecordBlock>) -> Self {
        let mut table = Self::default();
        for (position, record) in records.into_iter().enumerate() {
            table.defined.entry(record.id.clone()).or_insert(position);
            for field in &record.fields {
                if let Some(target) = field.value.referenced_id() {
                    table.references.push(Reference {
                        position,
                        record_id: record.id.clone(),
                        field: field.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }
        table
    }

    pub fn is_defined(&self, id: &str) -> bool {
        self.defined.contains_key(id)
    }

    pub fn defined(&self) -> impl Iterator<Item = &str> {
        self.defined.keys().map(String::as_str)
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Targets referenced by the document but not defined in it.
    pub fn unresolved(&self) -> BTreeSet<&str> {
        self.references
            .iter()
            .map(|reference| reference.target.as_str())
            .filter(|target| !self.defined.contains_key(*target))
            .collect()
    }

    /// References that neither the document nor `is_external` can resolve.
    pub fn dangling(&self, is_external: impl Fn(&str) -> bool) -> Vec<DanglingReference> {
        self.references
            .iter()
            .filter(|r| !self.defined.contains_key(&r.target) && !is_external(&r.target))
            .map(Reference::to_dangling)
            .collect()
    }

    /// References to ids that are only defined further down the document.
    pub fn forward_references(&self) -> Vec<DanglingReference> {
        self.references
            .iter()
            .filter(|r| matches!(self.defined.get(&r.target), Some(pos) if *pos > r.position))
            .map(Reference::to_dangling)
            .collect()
    }
}
