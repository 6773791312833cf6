use crate::error::FieldError;
use crate::models::{NewActa, NewCompromiso};

/// Upper bound for any stored attachment (5 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

/// Extensions accepted for Acta documents and Gestion attachments (compared lowercase).
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "jpg", "jpeg"];

pub const TITLE_MAX_CHARS: usize = 200;
pub const RESPONSIBLE_PARTY_MAX_CHARS: usize = 100;

const ACCENTED_LETTERS: &str = "áéíóúÁÉÍÓÚñÑ";

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || ACCENTED_LETTERS.contains(c) || matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Lowercased extension of `file_name`, if it has one.
pub fn extension_of(file_name: &str) -> Option<String> {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// validate_responsible_party
///
/// Full-name shape: non-blank, at least two whitespace-separated tokens, and only
/// letters from the explicit allow-list plus whitespace. The first failing rule wins.
pub fn validate_responsible_party(value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("El responsable no puede estar vacío".to_string());
    }
    if trimmed.split_whitespace().count() < 2 {
        return Err("El responsable debe incluir al menos nombre y apellido".to_string());
    }
    if !value.chars().all(is_name_char) {
        return Err("El responsable solo puede contener letras y espacios".to_string());
    }
    if value.chars().count() > RESPONSIBLE_PARTY_MAX_CHARS {
        return Err(format!(
            "El responsable no puede superar {} caracteres",
            RESPONSIBLE_PARTY_MAX_CHARS
        ));
    }
    Ok(())
}

/// validate_attachment_name
///
/// Extension rule only. Used where the file size is not known (e.g. a document
/// path recorded on an Acta).
pub fn validate_attachment_name(file_name: &str) -> Result<(), String> {
    match extension_of(file_name) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err("Solo se permiten archivos PDF, JPG o JPEG".to_string()),
    }
}

/// validate_attachment
///
/// Applies both the extension and the size rule. Each rule reports independently,
/// so an oversized `.png` yields two messages.
pub fn validate_attachment(file_name: &str, size: u64) -> Vec<String> {
    let mut messages = Vec::new();
    if let Err(msg) = validate_attachment_name(file_name) {
        messages.push(msg);
    }
    if size > MAX_ATTACHMENT_BYTES {
        messages.push("El archivo no puede ser mayor a 5MB".to_string());
    }
    messages
}

pub fn validate_new_acta(acta: &NewActa) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    let title = acta.title.trim();
    if title.is_empty() {
        errors.push(FieldError::new("titulo", "Este campo no puede estar vacío"));
    } else if acta.title.chars().count() > TITLE_MAX_CHARS {
        errors.push(FieldError::new(
            "titulo",
            format!("El título no puede superar {} caracteres", TITLE_MAX_CHARS),
        ));
    }
    if let Some(document) = &acta.document {
        if let Err(msg) = validate_attachment_name(document) {
            errors.push(FieldError::new("pdf", msg));
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_new_compromiso(compromiso: &NewCompromiso) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if compromiso.description.trim().is_empty() {
        errors.push(FieldError::new("descripcion", "Este campo no puede estar vacío"));
    }
    if let Err(msg) = validate_responsible_party(&compromiso.responsible_party) {
        errors.push(FieldError::new("responsable", msg));
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
