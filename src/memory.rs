use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepository,
        repo_types::{NewUser, User},
    },
    db::StoreError,
    todos::{
        repo::TodoRepository,
        repo_types::{NewTodo, Todo, TodoChanges},
    },
};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    todos: BTreeMap<i64, Todo>,
    next_todo_id: i64,
}

/// In-process store with the same contract as the Postgres repositories.
/// Each call holds the lock for its whole read-modify-write.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let email = user.email.to_lowercase();
        if inner.users.iter().any(|u| u.email == email) {
            return Err(StoreError::UniqueViolation);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl TodoRepository for MemoryStore {
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Todo>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .todos
            .values()
            .filter(|t| t.user_id == owner)
            .cloned()
            .collect())
    }

    async fn create(&self, todo: NewTodo) -> Result<Todo, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_todo_id += 1;
        let now = OffsetDateTime::now_utc();
        let todo = Todo {
            id: inner.next_todo_id,
            user_id: todo.user_id,
            title: todo.title,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        inner.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn update_owned(
        &self,
        owner: Uuid,
        id: i64,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(todo) = inner.todos.get_mut(&id).filter(|t| t.user_id == owner) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            todo.title = title;
        }
        if let Some(completed) = changes.completed {
            todo.completed = completed;
        }
        todo.updated_at = OffsetDateTime::now_utc();
        Ok(Some(todo.clone()))
    }

    async fn delete_owned(&self, owner: Uuid, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let owned = inner.todos.get(&id).is_some_and(|t| t.user_id == owner);
        if owned {
            inner.todos.remove(&id);
        }
        Ok(owned)
    }
}
