use sqlx::{Postgres, QueryBuilder};

use crate::{
    auth::AuthUser,
    models::{Acta, Role},
};

/// Scope
///
/// The set of Actas a caller may see, computed once per request from the
/// authenticated identity and shared by the list and detail lookups.
///
/// A base user sees an Acta when they created it, or when any of its
/// commitments names them: the responsible party contains their first name or
/// their last name (case-insensitive substring), or equals their trimmed full
/// name. The substring rules are loose: a short last name can match unrelated
/// people, and an empty name part matches every Acta that has at least one
/// commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Restricted {
        user_id: i64,
        first_name: String,
        last_name: String,
        full_name: String,
    },
}

impl Scope {
    pub fn for_user(user: &AuthUser) -> Self {
        match user.role {
            Role::Admin => Scope::All,
            Role::BaseUser => Scope::Restricted {
                user_id: user.id,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                full_name: format!("{} {}", user.first_name, user.last_name)
                    .trim()
                    .to_string(),
            },
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Scope::All)
    }

    /// admits
    ///
    /// In-process form of the predicate. `responsible_parties` are the
    /// responsible-party strings of every commitment owned by `acta`.
    pub fn admits<'a, I>(&self, acta: &Acta, responsible_parties: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        match self {
            Scope::All => true,
            Scope::Restricted {
                user_id,
                first_name,
                last_name,
                full_name,
            } => {
                if acta.creator_id == Some(*user_id) {
                    return true;
                }
                let first = first_name.to_lowercase();
                let last = last_name.to_lowercase();
                responsible_parties.into_iter().any(|party| {
                    let lowered = party.to_lowercase();
                    lowered.contains(&first) || lowered.contains(&last) || party == full_name.as_str()
                })
            }
        }
    }

    /// push_sql
    ///
    /// SQL form of the predicate, appended as ` AND (...)`. Expects the Acta
    /// table to be aliased `a` in the surrounding query. Nothing is pushed for
    /// an unrestricted scope.
    pub fn push_sql<'args>(&self, builder: &mut QueryBuilder<'args, Postgres>) {
        let Scope::Restricted {
            user_id,
            first_name,
            last_name,
            full_name,
        } = self
        else {
            return;
        };

        builder.push(" AND (a.creator_id = ");
        builder.push_bind(*user_id);
        builder.push(
            " OR EXISTS (SELECT 1 FROM compromisos vc WHERE vc.acta_id = a.id AND (vc.responsible_party ILIKE ",
        );
        builder.push_bind(contains_pattern(first_name));
        builder.push(r" ESCAPE '\' OR vc.responsible_party ILIKE ");
        builder.push_bind(contains_pattern(last_name));
        builder.push(r" ESCAPE '\' OR vc.responsible_party = ");
        builder.push_bind(full_name.clone());
        builder.push(")))");
    }
}

/// Builds a `%needle%` LIKE pattern with the needle's own wildcards escaped.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActaStatus;
    use chrono::Utc;

    fn base_user(first: &str, last: &str) -> AuthUser {
        AuthUser {
            id: 7,
            email: "maria.garcia@test.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            role: Role::BaseUser,
        }
    }

    fn acta(creator_id: Option<i64>) -> Acta {
        Acta {
            id: 1,
            title: "Reunión".to_string(),
            status: ActaStatus::Pending,
            created_at: Utc::now(),
            document: None,
            creator_id,
        }
    }

    #[test]
    fn admin_scope_is_unrestricted() {
        let mut admin = base_user("Admin", "Usuario");
        admin.role = Role::Admin;
        let scope = Scope::for_user(&admin);
        assert!(scope.is_unrestricted());
        assert!(scope.admits(&acta(Some(99)), []));
    }

    #[test]
    fn creator_sees_own_acta_without_commitments() {
        let scope = Scope::for_user(&base_user("María", "García"));
        assert!(scope.admits(&acta(Some(7)), []));
        assert!(!scope.admits(&acta(Some(8)), []));
        assert!(!scope.admits(&acta(None), []));
    }

    #[test]
    fn commitment_names_match_case_insensitively() {
        let scope = Scope::for_user(&base_user("María", "García"));
        assert!(scope.admits(&acta(None), ["MARÍA López"]));
        assert!(scope.admits(&acta(None), ["Pedro garcía"]));
        assert!(scope.admits(&acta(None), ["Pedro Pérez", "María García"]));
        assert!(!scope.admits(&acta(None), ["Pedro Pérez"]));
    }

    #[test]
    fn substring_rule_over_matches() {
        // "Ana" is contained in "Mariana Ruiz"; kept for compatibility.
        let scope = Scope::for_user(&base_user("Ana", "Gil"));
        assert!(scope.admits(&acta(None), ["Mariana Ruiz"]));
    }

    #[test]
    fn full_name_is_trimmed() {
        let scope = Scope::for_user(&base_user("Usuario", ""));
        match &scope {
            Scope::Restricted { full_name, .. } => assert_eq!(full_name, "Usuario"),
            Scope::All => panic!("expected restricted scope"),
        }
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("Ana"), "%Ana%");
        assert_eq!(contains_pattern("50%_a\\b"), r"%50\%\_a\\b%");
    }

    #[test]
    fn restricted_sql_binds_identity() {
        let scope = Scope::for_user(&base_user("María", "García"));
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT a.id FROM actas a WHERE TRUE");
        scope.push_sql(&mut builder);
        let sql = builder.sql();
        assert!(sql.contains("a.creator_id = $1"));
        assert!(sql.contains("vc.responsible_party ILIKE $2"));
        assert!(sql.contains("vc.responsible_party = $4"));
    }

    #[test]
    fn unrestricted_sql_is_untouched() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT a.id FROM actas a WHERE TRUE");
        Scope::All.push_sql(&mut builder);
        assert_eq!(builder.sql(), "SELECT a.id FROM actas a WHERE TRUE");
    }
}
