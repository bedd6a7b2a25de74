//! XML-RPC wire format.
//!
//! Calls are written with [`quick_xml::Writer`]. Responses are read into a small element tree
//! first, since a `<value>` can only be interpreted once its first child (or the lack of one)
//! is known.

use crate::value::Value;
use crate::{RpcError, RpcResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;

/// Encodes a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> RpcResult<String> {
    let mut writer = Writer::new(Vec::new());

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", None, None)))?;
    start(&mut writer, "methodCall")?;
    text_element(&mut writer, "methodName", method)?;
    start(&mut writer, "params")?;
    for param in params {
        start(&mut writer, "param")?;
        encode_value(&mut writer, param)?;
        end(&mut writer, "param")?;
    }
    end(&mut writer, "params")?;
    end(&mut writer, "methodCall")?;

    String::from_utf8(writer.into_inner()).map_err(|e| RpcError::Malformed(e.to_string()))
}

fn encode_value(writer: &mut Writer<Vec<u8>>, value: &Value) -> RpcResult<()> {
    start(writer, "value")?;
    match value {
        Value::Int(i) => text_element(writer, "int", &i.to_string())?,
        Value::Bool(b) => text_element(writer, "boolean", if *b { "1" } else { "0" })?,
        Value::String(s) => text_element(writer, "string", s)?,
        Value::Double(d) => text_element(writer, "double", &d.to_string())?,
        Value::Nil => emit(writer, Event::Empty(BytesStart::new("nil")))?,
        Value::Array(items) => {
            start(writer, "array")?;
            start(writer, "data")?;
            for item in items {
                encode_value(writer, item)?;
            }
            end(writer, "data")?;
            end(writer, "array")?;
        }
        Value::Struct(members) => {
            start(writer, "struct")?;
            for (name, member) in members {
                start(writer, "member")?;
                text_element(writer, "name", name)?;
                encode_value(writer, member)?;
                end(writer, "member")?;
            }
            end(writer, "struct")?;
        }
    }
    end(writer, "value")
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> RpcResult<()> {
    writer
        .write_event(event)
        .map_err(|e| RpcError::Malformed(format!("failed to encode call: {e}")))
}

fn start(writer: &mut Writer<Vec<u8>>, tag: &str) -> RpcResult<()> {
    emit(writer, Event::Start(BytesStart::new(tag)))
}

fn end(writer: &mut Writer<Vec<u8>>, tag: &str) -> RpcResult<()> {
    emit(writer, Event::End(BytesEnd::new(tag)))
}

fn text_element(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> RpcResult<()> {
    start(writer, tag)?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    end(writer, tag)
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Self::default()
        }
    }

    fn child(&self, name: &str) -> RpcResult<&Element> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RpcError::Malformed(format!("<{}> has no <{name}>", self.name)))
    }
}

fn read_tree(input: &str) -> RpcResult<Element> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            RpcError::Malformed(format!("at byte {}: {e}", reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => stack.push(Element::named(start.name().as_ref())),
            Event::Empty(start) => {
                let leaf = Element::named(start.name().as_ref());
                match stack.last_mut() {
                    Some(parent) => parent.children.push(leaf),
                    None => return Ok(leaf),
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| RpcError::Malformed(e.to_string()))?;
                    current.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                let Some(done) = stack.pop() else {
                    return Err(RpcError::Malformed("unbalanced closing tag".into()));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => return Ok(done),
                }
            }
            Event::Eof => return Err(RpcError::Malformed("empty or truncated document".into())),
            _ => {}
        }
    }
}

/// Decodes a `methodResponse`, turning a `<fault>` into [`RpcError::Fault`].
pub fn decode_response(input: &str) -> RpcResult<Value> {
    let root = read_tree(input)?;
    if root.name != "methodResponse" {
        return Err(RpcError::Malformed(format!(
            "expected <methodResponse>, got <{}>",
            root.name
        )));
    }

    let body = root
        .children
        .first()
        .ok_or_else(|| RpcError::Malformed("empty <methodResponse>".into()))?;

    match body.name.as_str() {
        "params" => decode_value(body.child("param")?.child("value")?),
        "fault" => {
            let fault = decode_value(body.child("value")?)?;
            let code = fault
                .get("faultCode")
                .and_then(Value::as_i64)
                .ok_or_else(|| RpcError::Malformed("fault without faultCode".into()))?;
            let message = fault
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Err(RpcError::Fault { code, message })
        }
        other => Err(RpcError::Malformed(format!("unexpected <{other}>"))),
    }
}

fn decode_value(element: &Element) -> RpcResult<Value> {
    let Some(typed) = element.children.first() else {
        return Ok(Value::String(element.text.clone()));
    };
    let text = typed.text.trim();

    match typed.name.as_str() {
        "int" | "i4" | "i8" => text
            .parse()
            .map(Value::Int)
            .map_err(|_| RpcError::Malformed(format!("bad integer '{text}'"))),
        "boolean" => match text {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(RpcError::Malformed(format!("bad boolean '{other}'"))),
        },
        "double" => text
            .parse()
            .map(Value::Double)
            .map_err(|_| RpcError::Malformed(format!("bad double '{text}'"))),
        "string" => Ok(Value::String(typed.text.clone())),
        "dateTime.iso8601" | "base64" => Ok(Value::String(text.to_string())),
        "nil" => Ok(Value::Nil),
        "array" => typed
            .child("data")?
            .children
            .iter()
            .map(decode_value)
            .collect::<RpcResult<Vec<_>>>()
            .map(Value::Array),
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member.child("name")?.text.clone();
                members.insert(name, decode_value(member.child("value")?)?);
            }
            Ok(Value::Struct(members))
        }
        other => Err(RpcError::Malformed(format!("unsupported value type <{other}>"))),
    }
}
