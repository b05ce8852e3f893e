//! Display shaping of fetched rows.

use serde_json::Value;
use sift_proto::Row;

use crate::catalog::{EntitySchema, FieldKind, FieldTypeConfig};

/// Caller-supplied display formatting.
///
/// Returning `None` leaves the field to the built-in rules.
pub trait DisplayFormatter: Send + Sync {
    fn format(&self, field: &str, value: &Value, row: &Row) -> Option<Value>;
}

impl<F> DisplayFormatter for F
where
    F: Fn(&str, &Value, &Row) -> Option<Value> + Send + Sync,
{
    fn format(&self, field: &str, value: &Value, row: &Row) -> Option<Value> {
        self(field, value, row)
    }
}

/// Shape a fetched row for output.
///
/// The primary key always comes first, followed by `select` (or every schema
/// field in name order). Missing fields render as `null`.
pub fn map_row(
    schema: &EntitySchema,
    row: &Row,
    select: Option<&[String]>,
    formatter: Option<&dyn DisplayFormatter>,
) -> Row {
    let mut out = Row::new();
    out.insert(
        schema.primary_key.clone(),
        row.get(&schema.primary_key).cloned().unwrap_or(Value::Null),
    );

    let names: Vec<&str> = match select {
        Some(fields) => fields.iter().map(String::as_str).collect(),
        None => schema.fields.names().collect(),
    };
    for name in names {
        if name == schema.primary_key || out.contains_key(name) {
            continue;
        }
        let raw = row.get(name).unwrap_or(&Value::Null);
        let rendered = match formatter.and_then(|f| f.format(name, raw, row)) {
            Some(value) => value,
            None => render_field(schema.field(name), raw),
        };
        out.insert(name.to_string(), rendered);
    }
    out
}

fn render_field(config: Option<&FieldTypeConfig>, raw: &Value) -> Value {
    let Some(config) = config else {
        return raw.clone();
    };
    match config.kind {
        FieldKind::Association => match raw {
            Value::Object(record) => display_value(record, config.display_field.as_deref()),
            other => other.clone(),
        },
        FieldKind::AssociationMany => match raw {
            Value::Array(records) if records.is_empty() => Value::Null,
            Value::Array(records) => {
                let labels: Vec<String> = records
                    .iter()
                    .map(|record| match record {
                        Value::Object(record) => {
                            display_text(&display_value(record, config.display_field.as_deref()))
                        }
                        other => display_text(other),
                    })
                    .collect();
                Value::String(labels.join(", "))
            }
            other => other.clone(),
        },
        FieldKind::Json => match raw {
            Value::Null | Value::String(_) => raw.clone(),
            Value::Object(map) if map.is_empty() => Value::String(String::new()),
            other => Value::String(other.to_string()),
        },
        _ => raw.clone(),
    }
}

/// Display value of a related record.
fn display_value(record: &Row, display_field: Option<&str>) -> Value {
    let candidates = display_field.into_iter().chain(["title", "name", "id"]);
    for field in candidates {
        if let Some(value) = record.get(field).filter(|v| !v.is_null()) {
            return value.clone();
        }
    }
    Value::Null
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> EntitySchema {
        EntitySchema::new("Post")
            .with_kind("title", FieldKind::String)
            .with_field(
                "author",
                FieldTypeConfig::new(FieldKind::Association).with_display_field("email"),
            )
            .with_kind("editor", FieldKind::Association)
            .with_kind("tags", FieldKind::AssociationMany)
            .with_kind("meta", FieldKind::Json)
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_primary_key_first_and_rendering() {
        let fetched = row(json!({
            "title": "Hello",
            "id": 9,
            "author": { "id": 1, "name": "Ann", "email": "ann@example.com" },
            "editor": { "id": 2, "name": "Ed" },
            "tags": [{ "id": 1, "title": "rust" }, { "id": 2 }],
            "meta": { "a": 1 }
        }));
        let out = map_row(&schema(), &fetched, None, None);
        assert_eq!(
            out.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["id", "author", "editor", "meta", "tags", "title"]
        );
        assert_eq!(out["author"], json!("ann@example.com"));
        assert_eq!(out["editor"], json!("Ed"));
        assert_eq!(out["tags"], json!("rust, 2"));
        assert_eq!(out["meta"], json!("{\"a\":1}"));
    }

    #[test]
    fn test_absent_values() {
        let fetched = row(json!({ "id": 1, "author": null, "tags": [], "meta": {} }));
        let out = map_row(&schema(), &fetched, None, None);
        assert_eq!(out["author"], Value::Null);
        assert_eq!(out["editor"], Value::Null);
        assert_eq!(out["tags"], Value::Null);
        assert_eq!(out["meta"], json!(""));
    }

    #[test]
    fn test_select_and_formatter() {
        let fetched = row(json!({ "id": 1, "title": "hello", "extra": 5 }));
        let upper = |field: &str, value: &Value, _row: &Row| -> Option<Value> {
            (field == "title").then(|| json!(value.as_str().unwrap_or_default().to_uppercase()))
        };
        let select = vec!["title".to_string(), "extra".to_string(), "id".to_string()];
        let out = map_row(&schema(), &fetched, Some(&select), Some(&upper));
        assert_eq!(
            out,
            row(json!({ "id": 1, "title": "HELLO", "extra": 5 }))
        );
    }
}
