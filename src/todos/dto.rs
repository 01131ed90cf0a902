use serde::{Deserialize, Serialize};

use crate::todos::repo_types::Todo;

/// Request body for `POST /todos`. Any owner field sent by the client is ignored.
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
}

/// Request body for `PUT /todos/:id`.
#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

/// Client view of a todo; the owner is not exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoView {
    pub id: i64,
    pub title: String,
    pub completed: bool,
}

impl From<Todo> for TodoView {
    fn from(t: Todo) -> Self {
        Self {
            id: t.id,
            title: t.title,
            completed: t.completed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
