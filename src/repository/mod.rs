use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    filters::ActaFilter,
    models::{
        Acta, ActaDetail, ActaSummary, Compromiso, Gestion, NewActa, NewCompromiso, NewGestion,
        NewUser, User,
    },
    visibility::Scope,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Failures of the persistence layer. Handlers turn these into a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness or foreign-key rule was broken.
    #[error("integrity violation: {0}")]
    Integrity(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers only see this
/// trait, so the Postgres implementation and the in-memory one are
/// interchangeable behind `RepositoryState`.
///
/// Reads of Actas always take the caller's `Scope`: there is no unscoped read
/// path for records.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & Tokens ---
    // Exact, case-sensitive match.
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;

    /// Returns the user's existing token, or stores `candidate` as their token
    /// when they have none yet.
    async fn get_or_create_token(&self, user_id: i64, candidate: String) -> RepoResult<String>;
    async fn user_for_token(&self, key: &str) -> RepoResult<Option<User>>;
    // True if a token was removed.
    async fn delete_token(&self, user_id: i64) -> RepoResult<bool>;

    // --- Actas ---
    /// Visible Actas matching `filter`, newest first (ties by id, descending).
    async fn list_actas(&self, scope: &Scope, filter: &ActaFilter) -> RepoResult<Vec<ActaSummary>>;
    /// `None` both when the id does not exist and when it is outside `scope`.
    async fn get_acta_detail(&self, scope: &Scope, id: i64) -> RepoResult<Option<ActaDetail>>;
    async fn find_acta_by_title(&self, title: &str) -> RepoResult<Option<Acta>>;
    async fn create_acta(&self, acta: NewActa) -> RepoResult<Acta>;

    // --- Compromisos ---
    async fn get_compromiso(&self, id: i64) -> RepoResult<Option<Compromiso>>;
    async fn find_compromiso(&self, acta_id: i64, description: &str) -> RepoResult<Option<Compromiso>>;
    async fn create_compromiso(&self, compromiso: NewCompromiso) -> RepoResult<Compromiso>;

    // --- Gestiones ---
    /// `actor_id` always comes from the authenticated request.
    async fn create_gestion(&self, gestion: NewGestion, actor_id: i64) -> RepoResult<Gestion>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
