//! Persistence seam.
//!
//! Each feature module declares its own repository trait (`UserRepo`,
//! `ProjectRepo`, `TaskRepo`); [`Store`] is the union the services work
//! against. Two backends implement it: [`PgStore`] over sqlx and
//! [`MemoryStore`] for local runs and tests. Lookups return `Option` so that
//! "absent" never looks like a failure, and every composite write is a single
//! atomic unit on both backends.

mod memory;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

pub use memory::MemoryStore;

use crate::auth::repo::UserRepo;
use crate::projects::repo::ProjectRepo;
use crate::tasks::repo::TaskRepo;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    /// A write referenced a row that does not exist.
    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),

    /// An assignment named a user who is neither owner nor collaborator.
    #[error("user {0} is not a member of the project")]
    NotMember(Uuid),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let what = match db_err.constraint() {
                    Some(c) if c.contains("email") => "email",
                    Some(c) if c.contains("username") => "username",
                    Some(c) if c.starts_with("project_collaborators") => "collaborator",
                    Some(c) if c.starts_with("task_assignments") => "assignment",
                    _ => "record",
                };
                return StoreError::Duplicate(what);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::MissingReference("record");
            }
        }
        StoreError::Database(err)
    }
}

pub trait Store: UserRepo + ProjectRepo + TaskRepo {}

impl<T> Store for T where T: UserRepo + ProjectRepo + TaskRepo {}

#[derive(Clone)]
pub struct PgStore {
    pub(crate) db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}
