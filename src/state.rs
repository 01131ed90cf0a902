use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{PgUserRepository, UserRepository};
use crate::auth::services::AccountService;
use crate::config::{AppConfig, JwtConfig};
use crate::db;
use crate::memory::MemoryStore;
use crate::todos::repo::{PgTodoRepository, TodoRepository};
use crate::todos::services::TodoService;

#[derive(Clone)]
pub struct AppState {
    pub jwt: Arc<JwtKeys>,
    pub accounts: AccountService,
    pub todos: TodoService,
}

impl AppState {
    /// Connects to Postgres, applies migrations and wires the services.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;

        let users = Arc::new(PgUserRepository::new(pool.clone())) as Arc<dyn UserRepository>;
        let todos = Arc::new(PgTodoRepository::new(pool)) as Arc<dyn TodoRepository>;
        Ok(Self::from_parts(&config.jwt, users, todos))
    }

    pub fn from_parts(
        jwt: &JwtConfig,
        users: Arc<dyn UserRepository>,
        todos: Arc<dyn TodoRepository>,
    ) -> Self {
        let jwt = Arc::new(JwtKeys::from_config(jwt));
        Self {
            accounts: AccountService::new(users, jwt.clone()),
            todos: TodoService::new(todos),
            jwt,
        }
    }

    /// State backed by [`MemoryStore`]; no database needed.
    pub fn in_memory(jwt: JwtConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        Self::from_parts(&jwt, store.clone(), store)
    }
}
