//! Output → human/json/raw string formatting.
//!
//! Three modes:
//! - **Human** (default): Redis-style, e.g. `"value"`, `(integer) 42`, `(nil)`
//! - **JSON** (`--json`): `serde_json::to_string_pretty`
//! - **Raw** (`--raw`): Bare values, no quotes, no type prefixes

use serde_json::{json, Value};
use stratadoc_engine::IndexInfo;

use crate::exec::Output;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Raw,
}

/// Format a successful output.
pub fn format_output(output: &Output, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => format_json(output),
        OutputMode::Raw => format_raw(output),
        OutputMode::Human => format_human(output),
    }
}

/// Format an error.
pub fn format_error(err: &anyhow::Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&json!({
            "error": format!("{:#}", err)
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Raw => format!("{:#}", err),
        OutputMode::Human => format!("(error) {:#}", err),
    }
}

fn to_json(output: &Output) -> Value {
    match output {
        Output::Id(id) => json!(id.to_hex()),
        Output::Document(None) => Value::Null,
        Output::Document(Some(stored)) => json!({
            "id": stored.id.to_hex(),
            "version": stored.version,
            "created_at": stored.created_at.to_rfc3339(),
            "updated_at": stored.updated_at.to_rfc3339(),
            "document": stored.document,
        }),
        Output::Documents(docs) => Value::Array(docs.clone()),
        Output::Count(n) => json!(n),
        Output::Bool(b) => json!(b),
        Output::Index(info) => json!(info),
        Output::Indexes(list) => json!(list),
        Output::Collections(list) => json!(list),
        Output::Translation(t) => json!({
            "clause": t.clause,
            "params": t.params.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        }),
    }
}

fn format_json(output: &Output) -> String {
    serde_json::to_string_pretty(&to_json(output))
        .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

fn format_raw(output: &Output) -> String {
    match output {
        Output::Id(id) => id.to_hex(),
        Output::Document(None) => String::new(),
        Output::Document(Some(stored)) => stored.document.to_string(),
        Output::Documents(docs) => docs
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        Output::Count(n) => n.to_string(),
        Output::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        Output::Index(info) => info.name.clone(),
        Output::Indexes(list) => list
            .iter()
            .map(|i| i.name.clone())
            .collect::<Vec<_>>()
            .join("\n"),
        Output::Collections(list) => list
            .iter()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>()
            .join("\n"),
        Output::Translation(t) => t.clause.clone(),
    }
}

fn format_human(output: &Output) -> String {
    match output {
        Output::Id(id) => format!("\"{}\"", id),
        Output::Document(None) => "(nil)".to_string(),
        Output::Document(Some(stored)) => format!(
            "{} (v{}, updated {})",
            stored.document,
            stored.version,
            stored.updated_at.to_rfc3339()
        ),
        Output::Documents(docs) => numbered(docs.iter().map(Value::to_string)),
        Output::Count(n) => format!("(integer) {}", n),
        Output::Bool(b) => format!("(boolean) {}", b),
        Output::Index(info) => describe_index(info),
        Output::Indexes(list) => numbered(list.iter().map(describe_index)),
        Output::Collections(list) => numbered(list.iter().map(|c| c.name.clone())),
        Output::Translation(t) => {
            let params = t
                .params
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}\nparams: [{}]", t.clause, params)
        }
    }
}

fn describe_index(info: &IndexInfo) -> String {
    let mut flags = Vec::new();
    if info.unique {
        flags.push("unique");
    }
    if info.sparse {
        flags.push("sparse");
    }
    if flags.is_empty() {
        format!("{} on {}", info.name, info.field_path)
    } else {
        format!("{} on {} ({})", info.name, info.field_path, flags.join(", "))
    }
}

fn numbered(items: impl Iterator<Item = String>) -> String {
    let lines: Vec<String> = items
        .enumerate()
        .map(|(i, item)| format!("{}) {}", i + 1, item))
        .collect();
    if lines.is_empty() {
        "(empty list)".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stratadoc_core::{DocumentId, FieldPath};
    use stratadoc_query::{Param, Translation};

    fn index(unique: bool, sparse: bool) -> IndexInfo {
        IndexInfo {
            collection: "users".into(),
            name: "users_email".into(),
            native_name: "sdx_1_users_email".into(),
            field_path: FieldPath::parse("email").unwrap(),
            unique,
            sparse,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_human_scalars() {
        assert_eq!(format_output(&Output::Count(3), OutputMode::Human), "(integer) 3");
        assert_eq!(format_output(&Output::Bool(false), OutputMode::Human), "(boolean) false");
        assert_eq!(format_output(&Output::Document(None), OutputMode::Human), "(nil)");
    }

    #[test]
    fn test_human_lists() {
        let docs = Output::Documents(vec![json!({"a": 1}), json!({"a": 2})]);
        assert_eq!(
            format_output(&docs, OutputMode::Human),
            "1) {\"a\":1}\n2) {\"a\":2}"
        );
        assert_eq!(
            format_output(&Output::Documents(vec![]), OutputMode::Human),
            "(empty list)"
        );
    }

    #[test]
    fn test_index_descriptions() {
        assert_eq!(
            format_output(&Output::Index(index(true, true)), OutputMode::Human),
            "users_email on email (unique, sparse)"
        );
        assert_eq!(
            format_output(&Output::Index(index(false, false)), OutputMode::Human),
            "users_email on email"
        );
        assert_eq!(
            format_output(&Output::Indexes(vec![index(false, false)]), OutputMode::Raw),
            "users_email"
        );
    }

    #[test]
    fn test_id_modes() {
        let id = DocumentId::new();
        let out = Output::Id(id);
        assert_eq!(format_output(&out, OutputMode::Raw), id.to_hex());
        assert_eq!(format_output(&out, OutputMode::Human), format!("\"{}\"", id));
        assert_eq!(format_output(&out, OutputMode::Json), format!("\"{}\"", id));
    }

    #[test]
    fn test_translation() {
        let out = Output::Translation(Translation {
            clause: "json_extract(data, '$.age') = ?".into(),
            params: vec![Param::Int(30)],
        });
        assert_eq!(
            format_output(&out, OutputMode::Human),
            "json_extract(data, '$.age') = ?\nparams: [30]"
        );
        let parsed: Value = serde_json::from_str(&format_output(&out, OutputMode::Json)).unwrap();
        assert_eq!(parsed["params"], json!(["30"]));
    }

    #[test]
    fn test_error_modes() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(format_error(&err, OutputMode::Human), "(error) boom");
        assert_eq!(format_error(&err, OutputMode::Raw), "boom");
        let parsed: Value = serde_json::from_str(&format_error(&err, OutputMode::Json)).unwrap();
        assert_eq!(parsed["error"], json!("boom"));
    }
}
