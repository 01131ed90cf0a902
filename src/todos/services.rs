use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    todos::{
        repo::TodoRepository,
        repo_types::{NewTodo, Todo, TodoChanges},
    },
};

fn clean_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title must not be empty".into()));
    }
    Ok(title.to_string())
}

/// Todo CRUD scoped to the caller. `owner` always comes from the verified token.
#[derive(Clone)]
pub struct TodoService {
    todos: Arc<dyn TodoRepository>,
}

impl TodoService {
    pub fn new(todos: Arc<dyn TodoRepository>) -> Self {
        Self { todos }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, owner: Uuid) -> Result<Vec<Todo>, AppError> {
        Ok(self.todos.list_by_owner(owner).await?)
    }

    #[instrument(skip(self, title))]
    pub async fn create(&self, owner: Uuid, title: &str) -> Result<Todo, AppError> {
        let title = clean_title(title)?;
        let todo = self
            .todos
            .create(NewTodo {
                user_id: owner,
                title,
            })
            .await?;
        info!(todo_id = todo.id, "todo created");
        Ok(todo)
    }

    /// Not-yours and does-not-exist both come back as `NotFound`.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        owner: Uuid,
        id: i64,
        mut changes: TodoChanges,
    ) -> Result<Todo, AppError> {
        if let Some(title) = changes.title.as_deref() {
            changes.title = Some(clean_title(title)?);
        }
        match self.todos.update_owned(owner, id, changes).await? {
            Some(todo) => Ok(todo),
            None => {
                warn!(todo_id = id, "update matched no owned todo");
                Err(AppError::NotFound)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, owner: Uuid, id: i64) -> Result<(), AppError> {
        if self.todos.delete_owned(owner, id).await? {
            info!(todo_id = id, "todo deleted");
            Ok(())
        } else {
            warn!(todo_id = id, "delete matched no owned todo");
            Err(AppError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn service() -> TodoService {
        TodoService::new(Arc::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn create_trims_and_defaults_incomplete() {
        let svc = service();
        let owner = Uuid::new_v4();
        let todo = svc.create(owner, "  buy milk ").await.unwrap();
        assert_eq!(todo.title, "buy milk");
        assert!(!todo.completed);
        assert_eq!(todo.user_id, owner);
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let svc = service();
        for title in ["", "   ", "\t\n"] {
            assert!(matches!(
                svc.create(Uuid::new_v4(), title).await,
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn other_owner_cannot_see_update_or_delete() {
        let svc = service();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let todo = svc.create(alice, "secret plan").await.unwrap();

        assert!(svc.list(bob).await.unwrap().is_empty());

        let changes = TodoChanges {
            title: Some("hijacked".into()),
            completed: Some(true),
        };
        assert!(matches!(
            svc.update(bob, todo.id, changes).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(svc.delete(bob, todo.id).await, Err(AppError::NotFound)));

        let mine = svc.list(alice).await.unwrap();
        assert_eq!(mine, vec![todo]);
    }

    #[tokio::test]
    async fn update_is_partial_and_validates_title() {
        let svc = service();
        let owner = Uuid::new_v4();
        let todo = svc.create(owner, "write tests").await.unwrap();

        let done = svc
            .update(owner, todo.id, TodoChanges { title: None, completed: Some(true) })
            .await
            .unwrap();
        assert_eq!(done.title, "write tests");
        assert!(done.completed);

        assert!(matches!(
            svc.update(owner, todo.id, TodoChanges { title: Some(" ".into()), completed: None })
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let svc = service();
        let owner = Uuid::new_v4();
        assert!(matches!(svc.delete(owner, 99).await, Err(AppError::NotFound)));

        let todo = svc.create(owner, "x").await.unwrap();
        svc.delete(owner, todo.id).await.unwrap();
        assert!(matches!(svc.delete(owner, todo.id).await, Err(AppError::NotFound)));
    }
}
