use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{RepoResult, Repository, RepositoryError};
use crate::{
    filters::{ActaFilter, sort_newest_first},
    models::{
        Acta, ActaDetail, ActaSummary, Compromiso, Gestion, NewActa, NewCompromiso, NewGestion,
        NewUser, User,
    },
    visibility::Scope,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    // user_id -> token key
    tokens: HashMap<i64, String>,
    actas: Vec<Acta>,
    compromisos: Vec<Compromiso>,
    gestiones: Vec<Gestion>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn responsible_parties(&self, acta_id: i64) -> impl Iterator<Item = &str> {
        self.compromisos
            .iter()
            .filter(move |c| c.acta_id == acta_id)
            .map(|c| c.responsible_party.as_str())
    }

    fn visible(&self, scope: &Scope, acta: &Acta) -> bool {
        scope.admits(acta, self.responsible_parties(acta.id))
    }

    fn email_of(&self, user_id: i64) -> Option<String> {
        self.users.iter().find(|u| u.id == user_id).map(|u| u.email.clone())
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process, used by the test-suite and for
/// running the API without a database. It enforces the same uniqueness and
/// parent-reference rules as the SQL schema and evaluates the visibility scope
/// with `Scope::admits`.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an Acta with an explicit creation timestamp. Only meant for
    /// fixtures; the trait method always stamps the current time.
    pub async fn insert_acta_at(&self, acta: NewActa, created_at: DateTime<Utc>) -> RepoResult<Acta> {
        let mut tables = self.tables.write().await;
        if let Some(creator) = acta.creator_id {
            if !tables.users.iter().any(|u| u.id == creator) {
                return Err(RepositoryError::Integrity(format!("user {} does not exist", creator)));
            }
        }
        let record = Acta {
            id: tables.next_id(),
            title: acta.title,
            status: acta.status,
            created_at,
            document: acta.document,
            creator_id: acta.creator_id,
        };
        tables.actas.push(record.clone());
        Ok(record)
    }

    /// Number of stored actions; handy for asserting that a rejected request wrote nothing.
    pub async fn gestion_count(&self) -> usize {
        self.tables.read().await.gestiones.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Integrity(format!("email {} already exists", user.email)));
        }
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(RepositoryError::Integrity(format!(
                "username {} already exists",
                user.username
            )));
        }
        let record = User {
            id: tables.next_id(),
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            password_hash: user.password_hash,
        };
        tables.users.push(record.clone());
        Ok(record)
    }

    async fn get_or_create_token(&self, user_id: i64, candidate: String) -> RepoResult<String> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == user_id) {
            return Err(RepositoryError::Integrity(format!("user {} does not exist", user_id)));
        }
        Ok(tables.tokens.entry(user_id).or_insert(candidate).clone())
    }

    async fn user_for_token(&self, key: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        let owner = tables
            .tokens
            .iter()
            .find(|(_, stored)| stored.as_str() == key)
            .map(|(user_id, _)| *user_id);
        Ok(owner.and_then(|id| tables.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn delete_token(&self, user_id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.tokens.remove(&user_id).is_some())
    }

    async fn list_actas(&self, scope: &Scope, filter: &ActaFilter) -> RepoResult<Vec<ActaSummary>> {
        let tables = self.tables.read().await;
        let mut visible: Vec<Acta> = tables
            .actas
            .iter()
            .filter(|a| tables.visible(scope, a) && filter.matches(a))
            .cloned()
            .collect();
        sort_newest_first(&mut visible);

        Ok(visible
            .into_iter()
            .map(|a| ActaSummary {
                compromisos_count: tables.compromisos.iter().filter(|c| c.acta_id == a.id).count() as i64,
                id: a.id,
                title: a.title,
                status: a.status,
                created_at: a.created_at,
            })
            .collect())
    }

    async fn get_acta_detail(&self, scope: &Scope, id: i64) -> RepoResult<Option<ActaDetail>> {
        let tables = self.tables.read().await;
        let Some(acta) = tables
            .actas
            .iter()
            .find(|a| a.id == id && tables.visible(scope, a))
            .cloned()
        else {
            return Ok(None);
        };

        let mut compromisos: Vec<Compromiso> = tables
            .compromisos
            .iter()
            .filter(|c| c.acta_id == acta.id)
            .cloned()
            .collect();
        compromisos.sort_by_key(|c| c.id);

        let mut gestiones: Vec<Gestion> = tables
            .gestiones
            .iter()
            .filter(|g| compromisos.iter().any(|c| c.id == g.compromiso_id))
            .map(|g| Gestion {
                actor_email: tables.email_of(g.actor_id),
                ..g.clone()
            })
            .collect();
        gestiones.sort_by_key(|g| g.id);

        Ok(Some(ActaDetail::assemble(acta, compromisos, gestiones)))
    }

    async fn find_acta_by_title(&self, title: &str) -> RepoResult<Option<Acta>> {
        let tables = self.tables.read().await;
        Ok(tables.actas.iter().find(|a| a.title == title).cloned())
    }

    async fn create_acta(&self, acta: NewActa) -> RepoResult<Acta> {
        self.insert_acta_at(acta, Utc::now()).await
    }

    async fn get_compromiso(&self, id: i64) -> RepoResult<Option<Compromiso>> {
        let tables = self.tables.read().await;
        Ok(tables.compromisos.iter().find(|c| c.id == id).cloned())
    }

    async fn find_compromiso(&self, acta_id: i64, description: &str) -> RepoResult<Option<Compromiso>> {
        let tables = self.tables.read().await;
        Ok(tables
            .compromisos
            .iter()
            .find(|c| c.acta_id == acta_id && c.description == description)
            .cloned())
    }

    async fn create_compromiso(&self, compromiso: NewCompromiso) -> RepoResult<Compromiso> {
        let mut tables = self.tables.write().await;
        if !tables.actas.iter().any(|a| a.id == compromiso.acta_id) {
            return Err(RepositoryError::Integrity(format!(
                "acta {} does not exist",
                compromiso.acta_id
            )));
        }
        let record = Compromiso {
            id: tables.next_id(),
            acta_id: compromiso.acta_id,
            description: compromiso.description,
            responsible_party: compromiso.responsible_party,
            due_date: compromiso.due_date,
        };
        tables.compromisos.push(record.clone());
        Ok(record)
    }

    async fn create_gestion(&self, gestion: NewGestion, actor_id: i64) -> RepoResult<Gestion> {
        let mut tables = self.tables.write().await;
        if !tables.compromisos.iter().any(|c| c.id == gestion.compromiso_id) {
            return Err(RepositoryError::Integrity(format!(
                "compromiso {} does not exist",
                gestion.compromiso_id
            )));
        }
        let Some(actor_email) = tables.email_of(actor_id) else {
            return Err(RepositoryError::Integrity(format!("user {} does not exist", actor_id)));
        };
        let record = Gestion {
            id: tables.next_id(),
            compromiso_id: gestion.compromiso_id,
            description: gestion.description,
            attachment: gestion.attachment,
            created_at: Utc::now(),
            actor_id,
            actor_email: Some(actor_email),
        };
        tables.gestiones.push(record.clone());
        Ok(record)
    }
}
