use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    InProgress,
    Completed,
    Error,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub tool_type: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    pub task_id: String,
    pub status: TaskState,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusReport {
    pub task_id: String,
    pub status: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub has_result: bool,
    #[serde(default)]
    pub has_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Document returned by `GET /api/v1/sdlc/tasks/{id}`. `content` holds the
/// task result as a JSON string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDocument {
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskDocument {
    pub fn parse_result(&self) -> Result<TaskResult, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// Final task result. Any JSON value the backend stores is accepted; the
/// fields tools usually emit are exposed as lenient accessors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct TaskResult(Value);

impl TaskResult {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Top-level field of an object result.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.as_object().and_then(|object| object.get(name))
    }

    pub fn summary(&self) -> Option<&str> {
        self.field("summary").and_then(Value::as_str)
    }

    pub fn output(&self) -> Option<&str> {
        self.field("output").and_then(Value::as_str)
    }

    /// Entries of a `files` array, whatever their shape.
    pub fn files(&self) -> &[Value] {
        self.field("files")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Paths named by `files`, taken from plain strings or a `path` key.
    pub fn file_paths(&self) -> Vec<&str> {
        self.files()
            .iter()
            .filter_map(|entry| match entry {
                Value::String(path) => Some(path.as_str()),
                other => other.get("path").and_then(Value::as_str),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uses_camel_case_and_skips_empty_fields() {
        let request = CreateTaskRequest {
            tool_type: "code_review".to_string(),
            task: "review the parser".to_string(),
            context: None,
            working_directory: Some("/srv/repo".to_string()),
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "toolType": "code_review",
                "task": "review the parser",
                "workingDirectory": "/srv/repo",
            })
        );
    }

    #[test]
    fn status_report_defaults_flags() {
        let report: TaskStatusReport =
            serde_json::from_str(r#"{"taskId":"t-1","status":"IN_PROGRESS"}"#).expect("decode");
        assert_eq!(report.status, TaskState::InProgress);
        assert!(!report.has_result);
        assert!(!report.has_error);
        assert!(report.error.is_none());
        assert!(!report.status.is_terminal());
        assert!(TaskState::Error.is_terminal());
    }

    #[test]
    fn document_content_parses_into_result() {
        let document: TaskDocument = serde_json::from_value(serde_json::json!({
            "id": "doc-1",
            "content": "{\"summary\":\"done\",\"files\":[\"src/lib.rs\"],\"score\":0.9}",
        }))
        .expect("decode");
        let result = document.parse_result().expect("result");
        assert_eq!(result.summary(), Some("done"));
        assert_eq!(result.file_paths(), vec!["src/lib.rs"]);
        assert_eq!(result.field("score"), Some(&serde_json::json!(0.9)));
        assert_eq!(document.extra.get("id"), Some(&serde_json::json!("doc-1")));
    }

    fn document(content: &str) -> TaskDocument {
        TaskDocument {
            content: content.to_string(),
            extra: Map::new(),
        }
    }

    #[test]
    fn object_file_entries_are_accepted() {
        let result = document(
            r#"{"summary":"ok","files":[{"path":"src/lib.rs","action":"modified"},"README.md"]}"#,
        )
        .parse_result()
        .expect("result");
        assert_eq!(result.summary(), Some("ok"));
        assert_eq!(result.files().len(), 2);
        assert_eq!(result.files()[0]["action"], "modified");
        assert_eq!(result.file_paths(), vec!["src/lib.rs", "README.md"]);
    }

    #[test]
    fn results_of_any_json_shape_parse() {
        let nested = document(r#"{"summary":{"text":"ok"}}"#)
            .parse_result()
            .expect("nested summary");
        assert_eq!(nested.summary(), None);
        assert_eq!(nested.field("summary"), Some(&serde_json::json!({"text": "ok"})));

        let steps = document(r#"["step 1","step 2"]"#)
            .parse_result()
            .expect("array result");
        assert_eq!(steps.value(), &serde_json::json!(["step 1", "step 2"]));
        assert!(steps.files().is_empty());
        assert_eq!(steps.summary(), None);
    }

    #[test]
    fn malformed_document_content_is_an_error() {
        assert!(document("not json").parse_result().is_err());
    }
}
