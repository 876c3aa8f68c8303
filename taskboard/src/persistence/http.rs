//! HTTP persistence client for `taskboard-server`.
//!
//! Speaks the JSON API under `/api`. A 404 maps to
//! [`PersistenceError::NotFound`]; any other non-success status maps to
//! [`PersistenceError::Status`] carrying the server's `error` text.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use taskboard_proto::api::{
    CreateProjectRequest, CreateTaskRequest, ErrorResponse, SuccessResponse,
    UpdateProjectRequest, UpdateTaskRequest,
};
use taskboard_proto::{Project, ProjectId, Task, TaskId};
use url::Url;

use super::{PersistenceError, PersistenceService};

/// [`PersistenceService`] backed by the server's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpPersistence {
    client: Client,
    /// API root, always ending in `/api/`.
    api: Url,
}

impl HttpPersistence {
    /// Creates a client for the server at `server_url` (e.g.
    /// `http://127.0.0.1:4000`).
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Request`] if the URL cannot be parsed.
    pub fn new(server_url: &str) -> Result<Self, PersistenceError> {
        Self::with_client(Client::new(), server_url)
    }

    /// Creates a client reusing an existing [`reqwest::Client`].
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Request`] if the URL cannot be parsed.
    pub fn with_client(client: Client, server_url: &str) -> Result<Self, PersistenceError> {
        let base = Url::parse(server_url)
            .map_err(|e| PersistenceError::Request(format!("invalid server url {server_url}: {e}")))?;
        let api = base
            .join("/api/")
            .map_err(|e| PersistenceError::Request(format!("invalid server url {server_url}: {e}")))?;
        Ok(Self { client, api })
    }

    fn url(&self, path: &str) -> Result<Url, PersistenceError> {
        self.api
            .join(path)
            .map_err(|e| PersistenceError::Request(format!("invalid path {path}: {e}")))
    }
}

/// Sends a request and decodes a JSON body, mapping failures by status.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, PersistenceError> {
    let response = request
        .send()
        .await
        .map_err(|e| PersistenceError::Request(e.to_string()))?;
    let response = check_status(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| PersistenceError::Decode(e.to_string()))
}

async fn check_status(response: Response) -> Result<Response, PersistenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
    };
    tracing::debug!(status = status.as_u16(), message = %message, "persistence request rejected");
    if status == reqwest::StatusCode::NOT_FOUND {
        Err(PersistenceError::NotFound(message))
    } else {
        Err(PersistenceError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl PersistenceService for HttpPersistence {
    async fn list_projects(&self) -> Result<Vec<Project>, PersistenceError> {
        send_json(self.client.get(self.url("projects")?)).await
    }

    async fn create_project(&self, description: &str) -> Result<Project, PersistenceError> {
        let body = CreateProjectRequest {
            description: description.to_string(),
        };
        send_json(self.client.post(self.url("projects")?).json(&body)).await
    }

    async fn update_project(&self, id: &ProjectId, description: &str) -> Result<(), PersistenceError> {
        let body = UpdateProjectRequest {
            description: description.to_string(),
        };
        let url = self.url(&format!("projects/{id}"))?;
        let _: SuccessResponse = send_json(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<(), PersistenceError> {
        let url = self.url(&format!("projects/{id}"))?;
        let _: SuccessResponse = send_json(self.client.delete(url)).await?;
        Ok(())
    }

    async fn list_tasks(&self, project: &ProjectId) -> Result<Vec<Task>, PersistenceError> {
        let url = self.url(&format!("projects/{project}/tasks"))?;
        send_json(self.client.get(url)).await
    }

    async fn create_task(&self, task: &Task) -> Result<Task, PersistenceError> {
        let body = CreateTaskRequest {
            id: Some(task.id.clone()),
            title: task.title.clone(),
            configuration: task.configuration.clone(),
        };
        let url = self.url(&format!("projects/{}/tasks", task.project_id))?;
        send_json(self.client.post(url).json(&body)).await
    }

    async fn update_task(&self, task: &Task) -> Result<Task, PersistenceError> {
        let body = UpdateTaskRequest {
            title: task.title.clone(),
            configuration: task.configuration.clone(),
        };
        let url = self.url(&format!("tasks/{}", task.id))?;
        send_json(self.client.put(url).json(&body)).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), PersistenceError> {
        let url = self.url(&format!("tasks/{id}"))?;
        let _: SuccessResponse = send_json(self.client.delete(url)).await?;
        Ok(())
    }
}
