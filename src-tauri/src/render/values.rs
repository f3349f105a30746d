use serde::Serialize;

pub const NO_VALUES: &str = "No helm values provided.";

/// Display form of a deployment's Helm values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValuesView {
    Empty { placeholder: &'static str },
    /// Normalized YAML.
    Rendered { text: String },
    /// Payload that failed to parse, shown as stored.
    Raw { text: String, error: String },
}

impl ValuesView {
    fn empty() -> Self {
        ValuesView::Empty {
            placeholder: NO_VALUES,
        }
    }

    /// The text a view should show, whichever variant this is.
    pub fn display_text(&self) -> &str {
        match self {
            ValuesView::Empty { placeholder } => *placeholder,
            ValuesView::Rendered { text } | ValuesView::Raw { text, .. } => text.as_str(),
        }
    }
}

/// Renders the stored payload. YAML text is parsed and re-serialized; a
/// payload stored as structured JSON is serialized as YAML directly.
pub fn render_helm_values(payload: &serde_json::Value) -> ValuesView {
    match payload {
        serde_json::Value::Null => ValuesView::empty(),
        serde_json::Value::String(text) => render_values_text(text),
        serde_json::Value::Object(map) if map.is_empty() => ValuesView::empty(),
        serde_json::Value::Array(items) if items.is_empty() => ValuesView::empty(),
        other => match serde_yaml::to_string(other) {
            Ok(text) => ValuesView::Rendered { text },
            Err(e) => ValuesView::Raw {
                text: other.to_string(),
                error: e.to_string(),
            },
        },
    }
}

pub fn render_values_text(raw: &str) -> ValuesView {
    if raw.trim().is_empty() {
        return ValuesView::empty();
    }

    let parsed: serde_yaml::Value = match serde_yaml::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("render: helm values are not valid YAML: {e}");
            return ValuesView::Raw {
                text: raw.to_string(),
                error: e.to_string(),
            };
        }
    };

    match &parsed {
        serde_yaml::Value::Null => return ValuesView::empty(),
        serde_yaml::Value::Mapping(map) if map.is_empty() => return ValuesView::empty(),
        _ => {}
    }

    match serde_yaml::to_string(&parsed) {
        Ok(text) => ValuesView::Rendered { text },
        Err(e) => ValuesView::Raw {
            text: raw.to_string(),
            error: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_text_is_normalized() {
        let view = render_values_text("replicaCount:   2\nimage: {repository: nginx, tag: latest}\n");
        assert_eq!(
            view,
            ValuesView::Rendered {
                text: "replicaCount: 2\nimage:\n  repository: nginx\n  tag: latest\n".to_string()
            }
        );
    }

    #[test]
    fn malformed_yaml_falls_back_to_raw_text() {
        let raw = "not: [valid yaml: structure";
        match render_values_text(raw) {
            ValuesView::Raw { text, error } => {
                assert_eq!(text, raw);
                assert!(!error.is_empty());
            }
            other => panic!("expected raw fallback, got {other:?}"),
        }
    }

    #[test]
    fn empty_payloads_show_placeholder() {
        for payload in [json!(null), json!(""), json!("   \n"), json!({}), json!("~"), json!("{}")] {
            assert_eq!(render_helm_values(&payload).display_text(), NO_VALUES, "{payload}");
        }
    }

    #[test]
    fn structured_payload_is_serialized_as_yaml() {
        let view = render_helm_values(&json!({"service": {"port": 80}}));
        assert_eq!(view.display_text(), "service:\n  port: 80\n");
    }
}
