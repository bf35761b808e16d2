use async_trait::async_trait;
use protocol::{CreateTaskRequest, CreateTaskResponse, TaskDocument, TaskStatusReport};
use tracing::info;

use crate::error::Result;
use crate::http::ConsoleHttp;

pub const TASKS_PATH: &str = "/api/v1/sdlc/tasks";

/// Backend operations the poller depends on.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn create_task(&self, request: &CreateTaskRequest) -> Result<CreateTaskResponse>;

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport>;

    async fn task_document(&self, task_id: &str) -> Result<TaskDocument>;
}

#[derive(Debug, Clone)]
pub struct HttpTaskClient {
    http: ConsoleHttp,
}

impl HttpTaskClient {
    pub fn new(http: ConsoleHttp) -> Self {
        Self { http }
    }
}

fn task_path(task_id: &str) -> String {
    format!("{TASKS_PATH}/{}", urlencoding::encode(task_id))
}

#[async_trait]
impl TaskApi for HttpTaskClient {
    async fn create_task(&self, request: &CreateTaskRequest) -> Result<CreateTaskResponse> {
        let response: CreateTaskResponse = self.http.post_json(TASKS_PATH, request).await?;
        info!(
            task_id = %response.task_id,
            tool_type = %request.tool_type,
            status = ?response.status,
            "task created"
        );
        Ok(response)
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport> {
        let path = format!("{}/status", task_path(task_id));
        self.http.get_json(&path, &Vec::new()).await
    }

    async fn task_document(&self, task_id: &str) -> Result<TaskDocument> {
        self.http.get_json(&task_path(task_id), &Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::http::HttpSettings;
    use mockito::Matcher;
    use protocol::TaskState;

    fn client(server: &mockito::ServerGuard) -> HttpTaskClient {
        HttpTaskClient::new(ConsoleHttp::new(server.url(), HttpSettings::default()).expect("client"))
    }

    #[test]
    fn task_ids_are_percent_encoded() {
        assert_eq!(task_path("a b/c"), "/api/v1/sdlc/tasks/a%20b%2Fc");
    }

    #[tokio::test]
    async fn create_status_and_document_round_trip_over_http() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/api/v1/sdlc/tasks")
            .match_body(Matcher::Json(serde_json::json!({
                "toolType": "code_generation",
                "task": "add a health endpoint",
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"taskId":"t-42","status":"IN_PROGRESS","message":"queued"}"#)
            .create_async()
            .await;
        let status = server
            .mock("GET", "/api/v1/sdlc/tasks/t-42/status")
            .with_status(200)
            .with_body(r#"{"taskId":"t-42","status":"COMPLETED","hasResult":true,"hasError":false}"#)
            .create_async()
            .await;
        let document = server
            .mock("GET", "/api/v1/sdlc/tasks/t-42")
            .with_status(200)
            .with_body(r#"{"content":"{\"summary\":\"added /health\"}"}"#)
            .create_async()
            .await;

        let api = client(&server);
        let created = api
            .create_task(&CreateTaskRequest {
                tool_type: "code_generation".to_string(),
                task: "add a health endpoint".to_string(),
                context: None,
                working_directory: None,
            })
            .await
            .expect("create");
        assert_eq!(created.task_id, "t-42");
        assert_eq!(created.status, TaskState::InProgress);

        let report = api.task_status("t-42").await.expect("status");
        assert_eq!(report.status, TaskState::Completed);
        assert!(report.has_result);

        let result = api
            .task_document("t-42")
            .await
            .expect("document")
            .parse_result()
            .expect("result");
        assert_eq!(result.summary(), Some("added /health"));

        create.assert_async().await;
        status.assert_async().await;
        document.assert_async().await;
    }

    #[tokio::test]
    async fn create_failure_is_returned_to_caller() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/sdlc/tasks")
            .with_status(422)
            .with_body(r#"{"detail":"toolType required"}"#)
            .create_async()
            .await;
        let err = client(&server)
            .create_task(&CreateTaskRequest {
                tool_type: String::new(),
                task: "x".to_string(),
                context: None,
                working_directory: None,
            })
            .await
            .expect_err("422");
        assert!(matches!(err, ClientError::Status { status: 422, .. }));
    }
}
