use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use serde_json::Value;

use crate::error::ApiError;

/// UploadedFile
///
/// The `archivo` part of a multipart submission, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// GestionSubmission
///
/// Raw, unvalidated body of `POST /gestiones/`, read from either JSON or
/// `multipart/form-data`. Values are kept as text so the handler can report
/// per-field errors (a non-numeric `compromiso` is a field error, not a
/// malformed body). Any other field the client sends, such as `usuario` or
/// `fecha`, is dropped here.
#[derive(Debug, Default)]
pub struct GestionSubmission {
    pub compromiso: Option<String>,
    pub descripcion: Option<String>,
    pub archivo: Option<UploadedFile>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Scalar JSON values as text; `null` counts as absent.
fn json_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl GestionSubmission {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut submission = GestionSubmission::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "compromiso" => {
                    submission.compromiso = Some(field.text().await.map_err(|e| ApiError::BadRequest(e.body_text()))?);
                }
                "descripcion" => {
                    submission.descripcion = Some(field.text().await.map_err(|e| ApiError::BadRequest(e.body_text()))?);
                }
                "archivo" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let data = field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    // Browsers send an empty, nameless part when no file was picked.
                    if !(file_name.is_empty() && data.is_empty()) {
                        submission.archivo = Some(UploadedFile { file_name, data });
                    }
                }
                _ => {}
            }
        }

        Ok(submission)
    }

    fn from_json(body: Value) -> Result<Self, ApiError> {
        let Value::Object(fields) = body else {
            return Err(ApiError::BadRequest("Expected a JSON object".to_string()));
        };
        Ok(GestionSubmission {
            compromiso: json_text(fields.get("compromiso")),
            descripcion: json_text(fields.get("descripcion")),
            archivo: None,
        })
    }
}

impl<S> FromRequest<S> for GestionSubmission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Self::from_json(body)
    }
}
