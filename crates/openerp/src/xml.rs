//! Rendering and parsing of OpenERP data files.
//!
//! Rendering uses a two-space indenting [`quick_xml::Writer`]. Attribute values escape
//! `&`, `<`, `>`, `"` and newlines only, so eval expressions keep their single quotes
//! readable, which is how the loader's own data files are written.

use crate::document::{Field, FieldValue, FixtureDocument, Node, RecordBlock};
use crate::{OpenErpError, OpenErpResult};
use quick_xml::escape::partial_escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

const ROOT_TAG: &str = "openerp";
const DATA_TAG: &str = "data";
const RECORD_TAG: &str = "record";
const FIELD_TAG: &str = "field";
const INDENT: usize = 2;

pub fn render(document: &FixtureDocument) -> OpenErpResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
    )?;
    emit(&mut writer, Event::Start(BytesStart::new(ROOT_TAG)))?;

    let mut data = BytesStart::new(DATA_TAG);
    if document.noupdate() {
        push_attribute(&mut data, "noupdate", "1");
    }

    if document.is_empty() {
        emit(&mut writer, Event::Empty(data))?;
    } else {
        emit(&mut writer, Event::Start(data))?;
        for node in document.nodes() {
            match node {
                Node::Comment(text) => {
                    emit(&mut writer, Event::Comment(BytesText::from_escaped(text.as_str())))?
                }
                Node::Record(record) => render_record(&mut writer, record)?,
            }
        }
        emit(&mut writer, Event::End(BytesEnd::new(DATA_TAG)))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new(ROOT_TAG)))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| OpenErpError::Write(e.to_string()))
}

fn render_record(writer: &mut Writer<Vec<u8>>, record: &RecordBlock) -> OpenErpResult<()> {
    let mut start = BytesStart::new(RECORD_TAG);
    push_attribute(&mut start, "id", &record.id);
    push_attribute(&mut start, "model", &record.model);

    if record.fields.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for field in &record.fields {
        render_field(writer, field)?;
    }
    emit(writer, Event::End(BytesEnd::new(RECORD_TAG)))
}

fn render_field(writer: &mut Writer<Vec<u8>>, field: &Field) -> OpenErpResult<()> {
    let mut start = BytesStart::new(FIELD_TAG);
    push_attribute(&mut start, "name", &field.name);

    match &field.value {
        FieldValue::Ref(id) => {
            push_attribute(&mut start, "ref", id);
            emit(writer, Event::Empty(start))
        }
        FieldValue::Eval(expression) => {
            push_attribute(&mut start, "eval", expression);
            emit(writer, Event::Empty(start))
        }
        FieldValue::DataRef { model, id } => {
            let expression = FieldValue::data_ref_expression(model, id);
            push_attribute(&mut start, "eval", &expression);
            emit(writer, Event::Empty(start))
        }
        FieldValue::Text(text) => {
            emit(writer, Event::Start(start))?;
            if !text.is_empty() {
                emit(writer, Event::Text(BytesText::from_escaped(partial_escape(text))))?;
            }
            emit(writer, Event::End(BytesEnd::new(FIELD_TAG)))
        }
    }
}

fn push_attribute(start: &mut BytesStart<'_>, key: &str, value: &str) {
    let escaped = escape_attribute(value);
    start.push_attribute(Attribute::from((key.as_bytes(), escaped.as_bytes())));
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            other => out.push(other),
        }
    }
    out
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> OpenErpResult<()> {
    writer
        .write_event(event)
        .map_err(|e| OpenErpError::Write(e.to_string()))
}

/// A `<field>` whose closing tag has not been seen yet.
struct PendingField {
    name: String,
    reference: Option<String>,
    eval: Option<String>,
    text: String,
}

impl PendingField {
    fn from_start(start: &BytesStart<'_>) -> OpenErpResult<Self> {
        let mut name = None;
        let mut reference = None;
        let mut eval = None;
        for (key, value) in attributes(start)? {
            match key.as_str() {
                "name" => name = Some(value),
                "ref" => reference = Some(value),
                "eval" => eval = Some(value),
                _ => {}
            }
        }

        Ok(Self {
            name: name.ok_or(OpenErpError::MissingFieldName)?,
            reference,
            eval,
            text: String::new(),
        })
    }

    fn finish(self) -> Field {
        let value = match (self.reference, self.eval) {
            (Some(id), _) => FieldValue::Ref(id),
            (None, Some(expression)) => match FieldValue::parse_data_ref(&expression) {
                Some((model, id)) => FieldValue::DataRef { model, id },
                None => FieldValue::Eval(expression),
            },
            (None, None) => FieldValue::Text(self.text),
        };
        Field {
            name: self.name,
            value,
        }
    }
}

fn record_from_start(start: &BytesStart<'_>) -> OpenErpResult<RecordBlock> {
    let mut id = None;
    let mut model = None;
    for (key, value) in attributes(start)? {
        match key.as_str() {
            "id" => id = Some(value),
            "model" => model = Some(value),
            _ => {}
        }
    }

    Ok(RecordBlock::new(
        model.ok_or(OpenErpError::MissingRecordAttribute("model"))?,
        id.ok_or(OpenErpError::MissingRecordAttribute("id"))?,
    ))
}

fn noupdate_from_start(start: &BytesStart<'_>) -> OpenErpResult<bool> {
    Ok(attributes(start)?
        .into_iter()
        .any(|(key, value)| key == "noupdate" && matches!(value.as_str(), "1" | "True" | "true")))
}

fn attributes(start: &BytesStart<'_>) -> OpenErpResult<Vec<(String, String)>> {
    start
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(|e| OpenErpError::InvalidXml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| OpenErpError::InvalidXml(e.to_string()))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

fn misplaced(element: &[u8], expected: &'static str) -> OpenErpError {
    OpenErpError::MisplacedElement {
        element: String::from_utf8_lossy(element).into_owned(),
        expected,
    }
}

/// Parses a data file into a [`FixtureDocument`].
///
/// Records from every `<data>` section are flattened into one document, in file order.
/// Elements other than `data`, `record` and `field` are skipped along with their content.
pub fn parse(input: &str) -> OpenErpResult<FixtureDocument> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut noupdate: Option<bool> = None;
    let mut nodes: Vec<Node> = Vec::new();
    let mut record: Option<RecordBlock> = None;
    let mut field: Option<PendingField> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            OpenErpError::InvalidXml(format!("at byte {}: {e}", reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => match start.name().as_ref() {
                b"openerp" | b"odoo" => {}
                b"data" => {
                    let value = noupdate_from_start(&start)?;
                    noupdate.get_or_insert(value);
                }
                b"record" => {
                    if record.is_some() {
                        return Err(misplaced(b"record", "<data>"));
                    }
                    record = Some(record_from_start(&start)?);
                }
                b"field" => {
                    if record.is_none() || field.is_some() {
                        return Err(misplaced(b"field", "<record>"));
                    }
                    field = Some(PendingField::from_start(&start)?);
                }
                other => {
                    let name = other.to_vec();
                    reader
                        .read_to_end(QName(&name))
                        .map_err(|e| OpenErpError::InvalidXml(e.to_string()))?;
                }
            },
            Event::Empty(start) => match start.name().as_ref() {
                b"data" => {
                    let value = noupdate_from_start(&start)?;
                    noupdate.get_or_insert(value);
                }
                b"record" => {
                    if record.is_some() {
                        return Err(misplaced(b"record", "<data>"));
                    }
                    nodes.push(Node::Record(record_from_start(&start)?));
                }
                b"field" => {
                    let Some(current) = record.as_mut() else {
                        return Err(misplaced(b"field", "<record>"));
                    };
                    current
                        .fields
                        .push(PendingField::from_start(&start)?.finish());
                }
                _ => {}
            },
            Event::Text(text) => {
                if let Some(pending) = field.as_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| OpenErpError::InvalidXml(e.to_string()))?;
                    pending.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(pending) = field.as_mut() {
                    pending.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Comment(comment) => {
                if record.is_none() {
                    nodes.push(Node::Comment(
                        String::from_utf8_lossy(&comment).into_owned(),
                    ));
                }
            }
            Event::End(end) => match end.name().as_ref() {
                b"field" => {
                    if let (Some(pending), Some(current)) = (field.take(), record.as_mut()) {
                        current.fields.push(pending.finish());
                    }
                }
                b"record" => {
                    if let Some(done) = record.take() {
                        nodes.push(Node::Record(done));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let mut document = FixtureDocument::with_noupdate(noupdate.unwrap_or(false));
    for node in nodes {
        match node {
            Node::Comment(text) => document.comment(text),
            Node::Record(block) => document.push(block),
        }
    }
    Ok(document)
}
