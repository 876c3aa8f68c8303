//! JSON HTTP API over the [`BoardStore`](crate::store::BoardStore).
//!
//! Handlers are thin: they extract path and body, call the store, and map
//! [`StoreError`] to a status code with an `{ "error": ... }` body.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use taskboard_proto::api::{
    CreateProjectRequest, CreateTaskRequest, ErrorResponse, SuccessResponse,
    UpdateProjectRequest, UpdateTaskRequest,
};
use taskboard_proto::{Project, ProjectId, Task, TaskId};

use crate::relay::ServerState;
use crate::store::{BoardEvent, StoreError};

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ProjectNotFound(_) | Self::TaskNotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateTask(_) => StatusCode::CONFLICT,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error = if status.is_server_error() {
            tracing::error!(error = %self, "storage failure");
            "internal storage error".to_string()
        } else {
            tracing::debug!(status = %status, error = %self, "request failed");
            self.to_string()
        };
        let body = ErrorResponse { error };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, StoreError>;

/// Routes for the persistence API. State is supplied by the caller.
pub fn router() -> Router<Arc<ServerState>> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            put(update_project).delete(delete_project),
        )
        .route(
            "/api/projects/{id}/tasks",
            get(list_tasks).post(create_task),
        )
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
        .route("/api/events", get(list_events))
}

async fn list_projects(State(state): State<Arc<ServerState>>) -> ApiResult<Vec<Project>> {
    Ok(Json(state.board.list_projects().await?))
}

async fn create_project(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<Project> {
    let project = state.board.create_project(&req.description).await?;
    tracing::info!(project_id = %project.id, "project created");
    Ok(Json(project))
}

async fn update_project(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<SuccessResponse> {
    state
        .board
        .update_project(&ProjectId::from_string(id), &req.description)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn delete_project(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<SuccessResponse> {
    let id = ProjectId::from_string(id);
    state.board.delete_project(&id).await?;
    tracing::info!(project_id = %id, "project deleted");
    Ok(Json(SuccessResponse::ok()))
}

async fn list_tasks(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Task>> {
    Ok(Json(
        state.board.list_tasks(&ProjectId::from_string(id)).await?,
    ))
}

async fn create_task(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Task> {
    Ok(Json(
        state
            .board
            .create_task(&ProjectId::from_string(id), req)
            .await?,
    ))
}

async fn update_task(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Task> {
    Ok(Json(
        state.board.update_task(&TaskId::from_string(id), req).await?,
    ))
}

async fn delete_task(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<SuccessResponse> {
    state.board.delete_task(&TaskId::from_string(id)).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn list_events(State(state): State<Arc<ServerState>>) -> ApiResult<Vec<BoardEvent>> {
    Ok(Json(state.board.events().await?))
}
