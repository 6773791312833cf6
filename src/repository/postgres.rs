use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};

use super::{RepoResult, Repository};
use crate::{
    filters::ActaFilter,
    models::{
        Acta, ActaDetail, ActaSummary, Compromiso, Gestion, NewActa, NewCompromiso, NewGestion,
        NewUser, User,
    },
    visibility::Scope,
};

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, role, password_hash";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Dynamic WHERE clauses are assembled with `QueryBuilder` and bound parameters only.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, username, first_name, last_name, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.email)
        .bind(user.username)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.role.as_str())
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// get_or_create_token
    ///
    /// Single upsert. On conflict the no-op update locks the stored row and
    /// returns its key, so concurrent first logins all get the winner's token.
    async fn get_or_create_token(&self, user_id: i64, candidate: String) -> RepoResult<String> {
        let key: String = sqlx::query_scalar(
            r#"
            INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET key = auth_tokens.key
            RETURNING key
            "#,
        )
        .bind(candidate)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(key)
    }

    async fn user_for_token(&self, key: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.role, u.password_hash
            FROM auth_tokens t JOIN users u ON u.id = t.user_id
            WHERE t.key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_token(&self, user_id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// list_actas
    ///
    /// Visibility and refinements become ` AND` clauses on the same statement, so
    /// matching several commitments never duplicates a row (EXISTS, not JOIN).
    async fn list_actas(&self, scope: &Scope, filter: &ActaFilter) -> RepoResult<Vec<ActaSummary>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT
                a.id, a.title, a.status, a.created_at,
                (SELECT COUNT(*) FROM compromisos c WHERE c.acta_id = a.id) AS compromisos_count
            FROM actas a
            WHERE TRUE
            "#,
        );
        scope.push_sql(&mut builder);
        filter.push_sql(&mut builder);
        builder.push(" ORDER BY a.created_at DESC, a.id DESC");

        let actas = builder
            .build_query_as::<ActaSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(actas)
    }

    async fn get_acta_detail(&self, scope: &Scope, id: i64) -> RepoResult<Option<ActaDetail>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT a.id, a.title, a.status, a.created_at, a.document, a.creator_id FROM actas a WHERE a.id = ",
        );
        builder.push_bind(id);
        scope.push_sql(&mut builder);

        let Some(acta) = builder
            .build_query_as::<Acta>()
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let compromisos = sqlx::query_as::<_, Compromiso>(
            "SELECT id, acta_id, description, responsible_party, due_date \
             FROM compromisos WHERE acta_id = $1 ORDER BY id",
        )
        .bind(acta.id)
        .fetch_all(&self.pool)
        .await?;

        let gestiones = sqlx::query_as::<_, Gestion>(
            r#"
            SELECT g.id, g.compromiso_id, g.description, g.attachment, g.created_at, g.actor_id,
                   u.email AS actor_email
            FROM gestiones g
            JOIN compromisos c ON c.id = g.compromiso_id
            LEFT JOIN users u ON u.id = g.actor_id
            WHERE c.acta_id = $1
            ORDER BY g.id
            "#,
        )
        .bind(acta.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ActaDetail::assemble(acta, compromisos, gestiones)))
    }

    async fn find_acta_by_title(&self, title: &str) -> RepoResult<Option<Acta>> {
        let acta = sqlx::query_as::<_, Acta>(
            "SELECT id, title, status, created_at, document, creator_id \
             FROM actas WHERE title = $1 ORDER BY id LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(acta)
    }

    async fn create_acta(&self, acta: NewActa) -> RepoResult<Acta> {
        let created = sqlx::query_as::<_, Acta>(
            "INSERT INTO actas (title, status, document, creator_id) VALUES ($1, $2, $3, $4) \
             RETURNING id, title, status, created_at, document, creator_id",
        )
        .bind(acta.title)
        .bind(acta.status.as_str())
        .bind(acta.document)
        .bind(acta.creator_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn get_compromiso(&self, id: i64) -> RepoResult<Option<Compromiso>> {
        let compromiso = sqlx::query_as::<_, Compromiso>(
            "SELECT id, acta_id, description, responsible_party, due_date FROM compromisos WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(compromiso)
    }

    async fn find_compromiso(&self, acta_id: i64, description: &str) -> RepoResult<Option<Compromiso>> {
        let compromiso = sqlx::query_as::<_, Compromiso>(
            "SELECT id, acta_id, description, responsible_party, due_date \
             FROM compromisos WHERE acta_id = $1 AND description = $2 ORDER BY id LIMIT 1",
        )
        .bind(acta_id)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(compromiso)
    }

    async fn create_compromiso(&self, compromiso: NewCompromiso) -> RepoResult<Compromiso> {
        let created = sqlx::query_as::<_, Compromiso>(
            "INSERT INTO compromisos (acta_id, description, responsible_party, due_date) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, acta_id, description, responsible_party, due_date",
        )
        .bind(compromiso.acta_id)
        .bind(compromiso.description)
        .bind(compromiso.responsible_party)
        .bind(compromiso.due_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// create_gestion
    ///
    /// Insert and JOIN in one statement so the response already carries the actor's email.
    async fn create_gestion(&self, gestion: NewGestion, actor_id: i64) -> RepoResult<Gestion> {
        let created = sqlx::query_as::<_, Gestion>(
            r#"
            WITH inserted AS (
                INSERT INTO gestiones (compromiso_id, description, attachment, actor_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id, compromiso_id, description, attachment, created_at, actor_id
            )
            SELECT i.id, i.compromiso_id, i.description, i.attachment, i.created_at, i.actor_id,
                   u.email AS actor_email
            FROM inserted i JOIN users u ON u.id = i.actor_id
            "#,
        )
        .bind(gestion.compromiso_id)
        .bind(gestion.description)
        .bind(gestion.attachment)
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}
