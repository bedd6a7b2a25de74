//! OpenERP data-file wire support.
//!
//! This crate is responsible for the on-disk XML format consumed by the OpenERP/Odoo data
//! loader (`<openerp><data>…</data></openerp>`): an in-memory document model, rendering to
//! pretty-printed XML, parsing existing data files back into the model, and the date
//! expressions the loader evaluates at import time.
//!
//! Clinical meaning (which records a patient admission produces) lives in `eobs-core`. This
//! crate handles file format only.

pub mod dates;
pub mod document;
pub mod symbols;
pub mod xml;

pub use dates::{DateExpr, DateMode};
pub use document::{Field, FieldValue, FixtureDocument, Node, RecordBlock};
pub use symbols::{DanglingReference, SymbolTable};

use thiserror::Error;

/// Errors returned by the `openerp` boundary crate.
#[derive(Debug, Error)]
pub enum OpenErpError {
    #[error("invalid XML: {0}")]
    InvalidXml(String),

    #[error("unexpected <{element}> outside of {expected}")]
    MisplacedElement {
        element: String,
        expected: &'static str,
    },

    #[error("<record> is missing the '{0}' attribute")]
    MissingRecordAttribute(&'static str),

    #[error("<field> is missing the 'name' attribute")]
    MissingFieldName,

    #[error("failed to write XML: {0}")]
    Write(String),
}

/// Type alias for Results that can fail with an [`OpenErpError`].
pub type OpenErpResult<T> = Result<T, OpenErpError>;
