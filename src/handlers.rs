use crate::{
    AppState,
    auth::{AuthUser, generate_token},
    error::{ApiError, ApiResult, ErrorResponse, FieldError},
    filters::{ActaFilter, ActaListParams},
    models::{
        ActaDetail, ActaSummary, CreateGestionRequest, GestionResponse, LoginRequest,
        LoginResponse, NewGestion, Role,
    },
    password::verify_password,
    storage::{StorageError, content_type_for},
    submission::GestionSubmission,
    validation::validate_attachment,
    visibility::Scope,
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// Directory under the media root that receives action attachments.
const GESTION_UPLOAD_DIR: &str = "gestiones";

// --- Authentication ---

/// login
///
/// [Public Route] Exchanges email and password for the caller's durable token,
/// creating it on first login. Unknown email, wrong password and an unreadable
/// stored hash all produce the same 400 body.
#[utoipa::path(
    post,
    path = "/login/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    // An unreadable body is just another failed login.
    let Ok(Json(payload)) = payload else {
        tracing::warn!("rejected login attempt");
        return Err(ApiError::InvalidCredentials);
    };

    let Some(user) = state.repo.find_user_by_email(&payload.email).await? else {
        tracing::warn!("rejected login attempt");
        return Err(ApiError::InvalidCredentials);
    };

    // A corrupt hash is logged but answered like a wrong password.
    let verified = verify_password(&payload.password, &user.password_hash).unwrap_or_else(|e| {
        tracing::error!(user_id = user.id, error = %e, "stored password hash is unusable");
        false
    });
    if !verified {
        tracing::warn!("rejected login attempt");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.repo.get_or_create_token(user.id, generate_token()).await?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        email: user.email,
        role: user.role,
        is_admin: user.role == Role::Admin,
    }))
}

/// logout
///
/// [Authenticated Route] Deletes the caller's token. The next login issues a new one.
#[utoipa::path(
    post,
    path = "/logout/",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Missing or unknown token", body = ErrorResponse)
    )
)]
pub async fn logout(auth: AuthUser, State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.repo.delete_token(auth.id).await?;
    tracing::info!(user_id = auth.id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

// --- Actas ---

/// list_actas
///
/// [Authenticated Route] Actas visible to the caller, narrowed by the optional
/// query refinements and ordered newest first.
#[utoipa::path(
    get,
    path = "/actas/",
    params(ActaListParams),
    responses(
        (status = 200, description = "Visible actas", body = [ActaSummary]),
        (status = 400, description = "Malformed filter", body = ErrorResponse),
        (status = 401, description = "Missing or unknown token", body = ErrorResponse)
    )
)]
pub async fn list_actas(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ActaListParams>,
) -> ApiResult<Json<Vec<ActaSummary>>> {
    let filter = ActaFilter::try_from(params).map_err(ApiError::Validation)?;
    let scope = Scope::for_user(&auth);
    let actas = state.repo.list_actas(&scope, &filter).await?;
    Ok(Json(actas))
}

/// get_acta
///
/// [Authenticated Route] Full nested view of one Acta. An Acta outside the
/// caller's scope is reported exactly like a missing one.
#[utoipa::path(
    get,
    path = "/actas/{id}/",
    params(("id" = i64, Path, description = "Acta ID")),
    responses(
        (status = 200, description = "Found", body = ActaDetail),
        (status = 401, description = "Missing or unknown token", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_acta(
    auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ActaDetail>> {
    // A non-numeric id can name no Acta.
    let Ok(Path(id)) = path else {
        return Err(ApiError::NotFound);
    };
    let scope = Scope::for_user(&auth);
    state
        .repo
        .get_acta_detail(&scope, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

// --- Gestiones ---

/// create_gestion
///
/// [Authenticated Route] Logs an action against a Compromiso. The actor is
/// always the caller; the timestamp is assigned on insert. All field problems
/// are collected and returned together.
#[utoipa::path(
    post,
    path = "/gestiones/",
    request_body(
        content = CreateGestionRequest,
        description = "JSON, or multipart/form-data with an optional `archivo` file part"
    ),
    responses(
        (status = 201, description = "Created", body = GestionResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Missing or unknown token", body = ErrorResponse)
    )
)]
pub async fn create_gestion(
    auth: AuthUser,
    State(state): State<AppState>,
    submission: GestionSubmission,
) -> ApiResult<(StatusCode, Json<GestionResponse>)> {
    let mut errors = Vec::new();

    let compromiso_id = match submission.compromiso.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(FieldError::new("compromiso", "Este campo es requerido."));
            None
        }
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(FieldError::new("compromiso", "Se requiere un número entero válido."));
                None
            }
        },
    };
    if let Some(id) = compromiso_id {
        if state.repo.get_compromiso(id).await?.is_none() {
            errors.push(FieldError::new(
                "compromiso",
                format!("El compromiso {} no existe.", id),
            ));
        }
    }

    let description = match submission.descripcion {
        None => {
            errors.push(FieldError::new("descripcion", "Este campo es requerido."));
            String::new()
        }
        Some(text) if text.trim().is_empty() => {
            errors.push(FieldError::new("descripcion", "Este campo no puede estar en blanco."));
            String::new()
        }
        Some(text) => text,
    };

    if let Some(file) = &submission.archivo {
        errors.extend(
            validate_attachment(&file.file_name, file.data.len() as u64)
                .into_iter()
                .map(|message| FieldError::new("archivo", message)),
        );
    }

    let compromiso_id = match compromiso_id {
        Some(id) if errors.is_empty() => id,
        _ => return Err(ApiError::Validation(errors)),
    };

    let attachment = match &submission.archivo {
        Some(file) => Some(
            state
                .storage
                .save(GESTION_UPLOAD_DIR, &file.file_name, &file.data)
                .await?,
        ),
        None => None,
    };

    let created = state
        .repo
        .create_gestion(
            NewGestion {
                compromiso_id,
                description,
                attachment: attachment.clone(),
            },
            auth.id,
        )
        .await;

    let gestion = match created {
        Ok(gestion) => gestion,
        Err(e) => {
            // No row references the stored file.
            if let Some(stored) = &attachment {
                if let Err(cleanup) = state.storage.delete(stored).await {
                    tracing::error!(media_path = %stored, error = %cleanup, "orphaned attachment not removed");
                }
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        gestion_id = gestion.id,
        compromiso_id,
        actor_id = auth.id,
        "gestion created"
    );

    Ok((StatusCode::CREATED, Json(gestion.into())))
}

// --- Media ---

/// serve_media
///
/// [Authenticated Route] Streams a stored file. Bad paths, missing files and
/// read failures are all a plain 404; the cause is only logged.
#[utoipa::path(
    get,
    path = "/media/{path}",
    params(("path" = String, Path, description = "Path relative to the media root")),
    responses(
        (status = 200, description = "File contents"),
        (status = 401, description = "Missing or unknown token", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn serve_media(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    match state.storage.read(&path).await {
        Ok(bytes) => match content_type_for(&path) {
            Some(content_type) => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
            None => bytes.into_response(),
        },
        Err(e @ (StorageError::NotFound(_) | StorageError::InvalidPath(_))) => {
            tracing::debug!(media_path = %path, error = %e, "media file not served");
            ApiError::NotFound.into_response()
        }
        Err(e) => {
            tracing::error!(media_path = %path, error = %e, "media read failed");
            ApiError::NotFound.into_response()
        }
    }
}
