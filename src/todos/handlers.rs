use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::middleware::AuthUser,
    error::AppError,
    state::AppState,
    todos::{
        dto::{CreateTodoRequest, MessageResponse, TodoView, UpdateTodoRequest},
        repo_types::TodoChanges,
    },
};

/// Per-user routes. Mounted behind `require_auth`.
pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/:id", put(update_todo).delete(delete_todo))
}

#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TodoView>>, AppError> {
    let todos = state.todos.list(user_id).await?;
    Ok(Json(todos.into_iter().map(TodoView::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoView>), AppError> {
    let Json(payload) = payload?;
    let todo = state.todos.create(user_id, &payload.title).await?;
    Ok((StatusCode::CREATED, Json(todo.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoView>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let changes = TodoChanges {
        title: payload.title,
        completed: payload.completed,
    };
    let todo = state.todos.update(user_id, id, changes).await?;
    Ok(Json(todo.into()))
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    state.todos.delete(user_id, id).await?;
    Ok(Json(MessageResponse {
        message: "deleted".into(),
    }))
}
