use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Upper bound for `POST /gestiones/` bodies. Larger than the attachment limit
/// so that an oversize file is reported by field validation.
pub const GESTION_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Authenticated Router Module
///
/// Every route here sits behind the token middleware, and each handler also
/// takes the resolved `AuthUser` to scope what it reads or to stamp what it writes.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /logout/
        // Revokes the caller's token.
        .route("/logout/", post(handlers::logout))
        // --- Actas ---
        // GET /actas/?estado=...&titulo=...&fecha=...
        // Lists the Actas visible to the caller.
        .route("/actas/", get(handlers::list_actas))
        // GET /actas/{id}/
        // Nested detail; out-of-scope ids answer 404 like unknown ones.
        .route("/actas/{id}/", get(handlers::get_acta))
        // --- Gestiones ---
        // POST /gestiones/
        // JSON or multipart with an optional attachment.
        .route(
            "/gestiones/",
            post(handlers::create_gestion).layer(DefaultBodyLimit::max(GESTION_BODY_LIMIT)),
        )
        // --- Media ---
        // GET /media/{*path}
        // Serves stored PDFs and images.
        .route("/media/{*path}", get(handlers::serve_media))
}
