use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use utoipa::IntoParams;

use crate::{error::FieldError, models::Acta, visibility::contains_pattern};

/// ActaListParams
///
/// Raw query parameters of `GET /actas/`. Blank values count as absent.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ActaListParams {
    /// Exact status (`pending`, `in_progress`, `completed`).
    pub estado: Option<String>,
    /// Case-insensitive substring of the title.
    pub titulo: Option<String>,
    /// Calendar date (`YYYY-MM-DD`) of the creation timestamp, in UTC.
    pub fecha: Option<String>,
}

/// ActaFilter
///
/// Parsed refinements, applied after the visibility scope. All present
/// refinements must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActaFilter {
    pub status: Option<String>,
    pub title_contains: Option<String>,
    pub created_on: Option<NaiveDate>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<ActaListParams> for ActaFilter {
    type Error = Vec<FieldError>;

    fn try_from(params: ActaListParams) -> Result<Self, Self::Error> {
        let created_on = match non_blank(params.fecha) {
            None => None,
            Some(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    return Err(vec![FieldError::new(
                        "fecha",
                        "Fecha inválida, use el formato YYYY-MM-DD",
                    )]);
                }
            },
        };

        Ok(ActaFilter {
            // An unknown status is not an error, it just matches nothing.
            status: non_blank(params.estado),
            title_contains: non_blank(params.titulo),
            created_on,
        })
    }
}

impl ActaFilter {
    pub fn matches(&self, acta: &Acta) -> bool {
        if let Some(status) = &self.status {
            if acta.status.as_str() != status.as_str() {
                return false;
            }
        }
        if let Some(needle) = &self.title_contains {
            if !acta.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(day) = self.created_on {
            if acta.created_at.date_naive() != day {
                return false;
            }
        }
        true
    }

    /// Appends one ` AND ...` clause per refinement. The Acta table must be aliased `a`.
    pub fn push_sql<'args>(&self, builder: &mut QueryBuilder<'args, Postgres>) {
        if let Some(status) = &self.status {
            builder.push(" AND a.status = ");
            builder.push_bind(status.clone());
        }
        if let Some(needle) = &self.title_contains {
            builder.push(" AND a.title ILIKE ");
            builder.push_bind(contains_pattern(needle));
            builder.push(r" ESCAPE '\'");
        }
        if let Some(day) = self.created_on {
            builder.push(" AND (a.created_at AT TIME ZONE 'UTC')::date = ");
            builder.push_bind(day);
        }
    }
}

/// Most recent first; ties broken by id, highest first.
pub fn sort_newest_first(actas: &mut [Acta]) {
    actas.sort_by(|x, y| {
        y.created_at
            .cmp(&x.created_at)
            .then_with(|| y.id.cmp(&x.id))
    });
}
