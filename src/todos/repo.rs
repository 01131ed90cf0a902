use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreError;
use crate::todos::repo_types::{NewTodo, Todo, TodoChanges};

/// Persistence capability for todos. Every read and write is scoped by owner;
/// update and delete must be a single conditional statement on `(id, owner)`.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// All todos of `owner`, ordered by id.
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Todo>, StoreError>;
    async fn create(&self, todo: NewTodo) -> Result<Todo, StoreError>;
    /// `None` when no row matches both `id` and `owner`.
    async fn update_owned(
        &self,
        owner: Uuid,
        id: i64,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError>;
    /// `false` when no row matches both `id` and `owner`.
    async fn delete_owned(&self, owner: Uuid, id: i64) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgTodoRepository {
    db: PgPool,
}

impl PgTodoRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoRepository for PgTodoRepository {
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Todo>, StoreError> {
        let rows = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, user_id, title, completed, created_at, updated_at
            FROM todos
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create(&self, todo: NewTodo) -> Result<Todo, StoreError> {
        let row = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (user_id, title, completed)
            VALUES ($1, $2, FALSE)
            RETURNING id, user_id, title, completed, created_at, updated_at
            "#,
        )
        .bind(todo.user_id)
        .bind(&todo.title)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_owned(
        &self,
        owner: Uuid,
        id: i64,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        let row = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
               SET title = COALESCE($3, title),
                   completed = COALESCE($4, completed),
                   updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, completed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.completed)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_owned(&self, owner: Uuid, id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            DELETE FROM todos
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
