//! Request parameter loading
//!
//! The second `request` argument is either a query string (`a=1&b=2`) or
//! `file://<path>`. Files are parsed by extension: `.ini`, `.xml`, `.json`,
//! anything else as a query string. Query strings and INI keys accept bracket
//! notation (`a[]=1&a[]=2`, `a[b]=c`) for arrays and nested objects.

use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;
use tracing::debug;
use transport::Parameters;

const FILE_PREFIX: &str = "file://";

/// Resolve the optional parameters argument into request parameters.
pub async fn load(argument: Option<&str>) -> Result<Parameters> {
    let Some(argument) = argument else {
        return Ok(Parameters::new());
    };

    let Some(path) = argument.strip_prefix(FILE_PREFIX) else {
        return Ok(parse_query(argument));
    };

    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ParameterFileMissing(path.to_string()));
        }
        Err(e) => {
            return Err(Error::ParameterFile {
                path: path.to_string(),
                reason: e.to_string(),
            });
        }
    };
    let contents = contents.trim();

    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    debug!(path, extension, "loading parameter file");

    match extension {
        "ini" => parse_ini(contents),
        "xml" => parse_xml(contents),
        "json" => parse_json(contents),
        _ => Ok(parse_query(contents)),
    }
}

/// Parse `a=1&b[]=2&c[d]=3` into parameters.
pub fn parse_query(query: &str) -> Parameters {
    let mut parameters = Parameters::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        insert_path(&mut parameters, &key, Value::String(value.into_owned()));
    }
    parameters
}

/// INI: `key = value` lines. Section headers and `;`/`#` comments are skipped,
/// surrounding quotes stripped.
pub fn parse_ini(contents: &str) -> Result<Parameters> {
    let mut parameters = Parameters::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::ParameterParse {
                format: "ini",
                reason: format!("line {} has no '='", number + 1),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::ParameterParse {
                format: "ini",
                reason: format!("line {} has an empty key", number + 1),
            });
        }
        insert_path(&mut parameters, key, Value::String(unquote(value.trim()).to_string()));
    }
    Ok(parameters)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2
            && let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// XML: each child element of the root becomes a parameter. Elements with
/// children become objects; repeated tags become arrays.
pub fn parse_xml(contents: &str) -> Result<Parameters> {
    let document = roxmltree::Document::parse(contents).map_err(|e| Error::ParameterParse {
        format: "xml",
        reason: e.to_string(),
    })?;
    Ok(element_children(document.root_element()))
}

fn element_children(node: roxmltree::Node<'_, '_>) -> Parameters {
    let mut map = Parameters::new();
    for child in node.children().filter(|n| n.is_element()) {
        let name = child.tag_name().name().to_string();
        let value = element_value(child);
        match map.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(name, value);
            }
        }
    }
    map
}

fn element_value(node: roxmltree::Node<'_, '_>) -> Value {
    if node.children().any(|n| n.is_element()) {
        Value::Object(element_children(node))
    } else {
        Value::String(node.text().unwrap_or_default().trim().to_string())
    }
}

/// JSON: the document must be an object.
pub fn parse_json(contents: &str) -> Result<Parameters> {
    let value: Value = serde_json::from_str(contents).map_err(|e| Error::ParameterParse {
        format: "json",
        reason: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::ParameterParse {
            format: "json",
            reason: "expected a JSON object".into(),
        }),
    }
}

/// Split `a[b][]` into `("a", ["b", ""])`. Keys without well-formed brackets
/// are taken literally.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    if open == 0 {
        return (key, Vec::new());
    }

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }

    if segments.is_empty() {
        (key, Vec::new())
    } else {
        (&key[..open], segments)
    }
}

fn insert_path(parameters: &mut Parameters, key: &str, value: Value) {
    let (head, segments) = split_key(key);
    if segments.is_empty() {
        parameters.insert(head.to_string(), value);
        return;
    }
    let slot = parameters.entry(head.to_string()).or_insert(Value::Null);
    assign(slot, &segments, value);
}

fn assign(slot: &mut Value, segments: &[&str], value: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };

    if segment.is_empty() {
        // `[]` appends
        match slot {
            Value::Array(items) => {
                items.push(Value::Null);
                if let Some(child) = items.last_mut() {
                    assign(child, rest, value);
                }
            }
            Value::Object(map) => {
                let index = map.len().to_string();
                let child = map.entry(index).or_insert(Value::Null);
                assign(child, rest, value);
            }
            _ => {
                let mut child = Value::Null;
                assign(&mut child, rest, value);
                *slot = Value::Array(vec![child]);
            }
        }
        return;
    }

    if let Value::Array(items) = slot {
        let map = items
            .drain(..)
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect();
        *slot = Value::Object(map);
    }
    if !slot.is_object() {
        *slot = Value::Object(Parameters::new());
    }
    if let Value::Object(map) = slot {
        let child = map.entry(segment.to_string()).or_insert(Value::Null);
        assign(child, rest, value);
    }
}
