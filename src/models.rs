use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Enumerations ---

/// Role
///
/// RBAC label stored as text in `users.role`. Only `Admin` bypasses the visibility filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    BaseUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::BaseUser => "base_user",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "admin" => Ok(Role::Admin),
            "base_user" => Ok(Role::BaseUser),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// ActaStatus
///
/// Free-standing status label. There are no transition rules between values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ActaStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl ActaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActaStatus::Pending => "pending",
            ActaStatus::InProgress => "in_progress",
            ActaStatus::Completed => "completed",
        }
    }
}

impl TryFrom<String> for ActaStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(ActaStatus::Pending),
            "in_progress" => Ok(ActaStatus::InProgress),
            "completed" => Ok(ActaStatus::Completed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

// --- Persistent Records (Mapped to Database) ---

/// User
///
/// Identity record from the `users` table. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, FromRow, Default)]
pub struct User {
    pub id: i64,
    // Login identifier, unique.
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Acta
///
/// A minutes record from the `actas` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Acta {
    pub id: i64,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: ActaStatus,
    // Assigned by the database on insert, never updated.
    pub created_at: DateTime<Utc>,
    // Relative path under the media root.
    pub document: Option<String>,
    pub creator_id: Option<i64>,
}

/// Compromiso
///
/// A commitment row; always owned by exactly one Acta.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Compromiso {
    pub id: i64,
    pub acta_id: i64,
    pub description: String,
    pub responsible_party: String,
    pub due_date: NaiveDate,
}

/// Gestion
///
/// An action logged against a Compromiso, augmented with the actor's email
/// (loaded via a JOIN in the repository query).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Gestion {
    pub id: i64,
    pub compromiso_id: i64,
    pub description: String,
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub actor_id: i64,
    #[sqlx(default)]
    pub actor_email: Option<String>,
}

// --- Write Payloads (internal) ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewActa {
    pub title: String,
    pub status: ActaStatus,
    pub document: Option<String>,
    pub creator_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewCompromiso {
    pub acta_id: i64,
    pub description: String,
    pub responsible_party: String,
    pub due_date: NaiveDate,
}

/// NewGestion
///
/// Deliberately carries no actor: the repository receives the acting user as a
/// separate argument taken from the authenticated request.
#[derive(Debug, Clone)]
pub struct NewGestion {
    pub compromiso_id: i64,
    pub description: String,
    pub attachment: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Missing fields deserialize to empty strings so that every malformed login
/// produces the same invalid-credentials response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// CreateGestionRequest
///
/// JSON body accepted by `POST /gestiones/`. Multipart submissions carry the same
/// fields plus an optional `archivo` file part.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateGestionRequest {
    pub compromiso: Option<i64>,
    pub descripcion: Option<String>,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub is_admin: bool,
}

/// ActaSummary
///
/// One row of `GET /actas/`. Read straight from the list query, which also
/// computes the commitment count.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct ActaSummary {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "estado")]
    #[sqlx(try_from = "String")]
    pub status: ActaStatus,
    #[serde(rename = "fecha")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub compromisos_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GestionView {
    pub id: i64,
    #[serde(rename = "descripcion")]
    pub description: String,
    // Media URL, not the raw storage path.
    #[serde(rename = "archivo")]
    pub attachment_url: Option<String>,
    #[serde(rename = "fecha")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub usuario_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CompromisoDetail {
    pub id: i64,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "responsable")]
    pub responsible_party: String,
    #[serde(rename = "fecha_limite")]
    #[ts(type = "string")]
    pub due_date: NaiveDate,
    pub gestiones: Vec<GestionView>,
}

/// ActaDetail
///
/// Full nested view returned by `GET /actas/{id}/`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ActaDetail {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "estado")]
    pub status: ActaStatus,
    #[serde(rename = "fecha")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "pdf")]
    pub document_url: Option<String>,
    pub compromisos: Vec<CompromisoDetail>,
}

/// GestionResponse
///
/// Body of a successful `POST /gestiones/` (201).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GestionResponse {
    pub id: i64,
    pub compromiso: i64,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "archivo")]
    pub attachment_url: Option<String>,
    #[serde(rename = "fecha")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub usuario_email: Option<String>,
}

// --- Conversions ---

/// Renders a stored relative path as the URL served by the media gateway.
pub fn media_url(path: Option<&str>) -> Option<String> {
    path.map(|p| format!("/media/{}", p.trim_start_matches('/')))
}

impl From<Gestion> for GestionView {
    fn from(g: Gestion) -> Self {
        GestionView {
            id: g.id,
            attachment_url: media_url(g.attachment.as_deref()),
            description: g.description,
            created_at: g.created_at,
            usuario_email: g.actor_email,
        }
    }
}

impl From<Gestion> for GestionResponse {
    fn from(g: Gestion) -> Self {
        GestionResponse {
            id: g.id,
            compromiso: g.compromiso_id,
            attachment_url: media_url(g.attachment.as_deref()),
            description: g.description,
            created_at: g.created_at,
            usuario_email: g.actor_email,
        }
    }
}

impl ActaDetail {
    /// Nests commitments and their actions under the record. Children keep the
    /// order they are given in; actions whose commitment is absent are dropped.
    pub fn assemble(acta: Acta, compromisos: Vec<Compromiso>, gestiones: Vec<Gestion>) -> Self {
        let mut details: Vec<CompromisoDetail> = compromisos
            .into_iter()
            .map(|c| CompromisoDetail {
                id: c.id,
                description: c.description,
                responsible_party: c.responsible_party,
                due_date: c.due_date,
                gestiones: Vec::new(),
            })
            .collect();

        for gestion in gestiones {
            if let Some(parent) = details.iter_mut().find(|c| c.id == gestion.compromiso_id) {
                parent.gestiones.push(gestion.into());
            }
        }

        ActaDetail {
            id: acta.id,
            document_url: media_url(acta.document.as_deref()),
            title: acta.title,
            status: acta.status,
            created_at: acta.created_at,
            compromisos: details,
        }
    }
}
