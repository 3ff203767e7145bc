use std::collections::BTreeMap;

use serde_json::{Map, Value};

pub type Contact = Map<String, Value>;

/// Builds the flat display fields for a contact from `{path}` templates.
///
/// A path is a field name followed by `[index]` or `[key]` selectors, e.g.
/// `{businessPhones[0]}` or `{emailAddresses[0][address]}`. Fields whose
/// template cannot be fully resolved are set to `null`.
pub fn format_columns(contact: &Contact, columns: &BTreeMap<String, String>) -> Contact {
    columns
        .iter()
        .map(|(name, template)| {
            let value = render_template(template, contact)
                .map(Value::String)
                .unwrap_or(Value::Null);
            (name.clone(), value)
        })
        .collect()
}

fn render_template(template: &str, contact: &Contact) -> Option<String> {
    let mut out = String::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let (head, tail) = rest.split_at(start);
        out.push_str(&head.replace("}}", "}"));
        if let Some(escaped) = tail.strip_prefix("{{") {
            out.push('{');
            rest = escaped;
            continue;
        }
        let end = tail.find('}')?;
        let path = tail[1..end].trim();
        out.push_str(&render_value(lookup_path(path, contact)?)?);
        rest = &tail[end + 1..];
    }
    out.push_str(&rest.replace("}}", "}"));
    Some(out)
}

fn lookup_path<'a>(path: &str, contact: &'a Contact) -> Option<&'a Value> {
    let (name, mut selectors) = match path.find('[') {
        Some(idx) => path.split_at(idx),
        None => (path, ""),
    };
    let mut cur = contact.get(name)?;
    while !selectors.is_empty() {
        let inner = selectors.strip_prefix('[')?;
        let end = inner.find(']')?;
        let selector = &inner[..end];
        cur = match cur {
            Value::Array(arr) => arr.get(selector.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(selector)?,
            _ => return None,
        };
        selectors = &inner[end + 1..];
    }
    Some(cur)
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
