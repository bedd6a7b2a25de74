//! In-memory model of an OpenERP data file.
//!
//! A document is `<openerp><data noupdate="1">` wrapping an ordered list of comments and
//! `<record>` blocks. Order is kept exactly as appended so that rendering the same sequence of
//! calls always produces the same bytes.

use crate::symbols::SymbolTable;
use crate::{xml, OpenErpResult};

/// The value carried by a `<field>` element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// Literal element text.
    Text(String),
    /// `ref="…"`: the XML id of another record.
    Ref(String),
    /// `eval="…"`: an expression evaluated by the loader.
    Eval(String),
    /// `eval="'<model>,' + str(ref('<id>'))"`: a reference field holding both model and id.
    DataRef { model: String, id: String },
}

impl FieldValue {
    /// Renders a data reference in the loader's expression syntax.
    pub fn data_ref_expression(model: &str, id: &str) -> String {
        format!("'{model},' + str(ref('{id}'))")
    }

    /// Recognises an expression written by [`FieldValue::data_ref_expression`].
    pub fn parse_data_ref(expression: &str) -> Option<(String, String)> {
        let rest = expression.strip_prefix('\'')?;
        let (model, rest) = rest.split_once(",' + str(ref('")?;
        let id = rest.strip_suffix("'))")?;
        if model.is_empty() || id.is_empty() || id.contains('\'') {
            return None;
        }
        Some((model.to_string(), id.to_string()))
    }

    /// The XML id this value points at, if any.
    pub fn referenced_id(&self) -> Option<&str> {
        match self {
            FieldValue::Ref(id) | FieldValue::DataRef { id, .. } => Some(id),
            FieldValue::Text(_) | FieldValue::Eval(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// A `<record model="…" id="…">` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordBlock {
    pub model: String,
    pub id: String,
    pub fields: Vec<Field>,
}

impl RecordBlock {
    pub fn new(model: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value,
        });
        self
    }

    pub fn text(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.field(name, FieldValue::Text(text.into()))
    }

    pub fn reference(self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.field(name, FieldValue::Ref(id.into()))
    }

    pub fn eval(self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.field(name, FieldValue::Eval(expression.into()))
    }

    pub fn data_ref(
        self,
        name: impl Into<String>,
        model: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        self.field(
            name,
            FieldValue::DataRef {
                model: model.into(),
                id: id.into(),
            },
        )
    }

    /// Returns the first field with the given name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    /// Returns the text of a literal field.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Returns the target of a `ref` field.
    pub fn get_ref(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Ref(id)) => Some(id),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Comment(String),
    Record(RecordBlock),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureDocument {
    noupdate: bool,
    nodes: Vec<Node>,
}

impl Default for FixtureDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureDocument {
    /// Creates an empty `noupdate="1"` document.
    pub fn new() -> Self {
        Self::with_noupdate(true)
    }

    pub fn with_noupdate(noupdate: bool) -> Self {
        Self {
            noupdate,
            nodes: Vec::new(),
        }
    }

    pub fn noupdate(&self) -> bool {
        self.noupdate
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.nodes.push(Node::Comment(text.into()));
    }

    pub fn push(&mut self, record: RecordBlock) {
        self.nodes.push(Node::Record(record));
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordBlock> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Record(record) => Some(record),
            Node::Comment(_) => None,
        })
    }

    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Comment(text) => Some(text.as_str()),
            Node::Record(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends every node of `other`, keeping its order.
    pub fn extend(&mut self, other: FixtureDocument) {
        self.nodes.extend(other.nodes);
    }

    /// Builds the table of defined and referenced XML ids.
    pub fn symbols(&self) -> SymbolTable {
        SymbolTable::from_records(self.records())
    }

    /// Renders the document as pretty-printed XML.
    pub fn render(&self) -> OpenErpResult<String> {
        xml::render(self)
    }

    /// Parses an existing data file.
    pub fn parse(input: &str) -> OpenErpResult<Self> {
        xml::parse(input)
    }
}
