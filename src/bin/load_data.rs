use actas_backend::{
    config::AppConfig,
    error::FieldError,
    models::{ActaStatus, NewActa, NewCompromiso, NewUser, Role, User},
    password::{PasswordError, hash_password},
    repository::{PostgresRepository, Repository, RepositoryError},
    validation::{validate_new_acta, validate_new_compromiso},
};
use chrono::{Days, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, thiserror::Error)]
enum SeedError {
    #[error(transparent)]
    Config(#[from] actas_backend::ConfigError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("invalid seed record '{record}': {errors:?}")]
    Invalid { record: String, errors: Vec<FieldError> },
}

struct SeedUser {
    email: &'static str,
    username: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    role: Role,
    password: &'static str,
}

const USERS: [SeedUser; 3] = [
    SeedUser {
        email: "admin@test.com",
        username: "admin",
        first_name: "Admin",
        last_name: "Usuario",
        role: Role::Admin,
        password: "admin123",
    },
    SeedUser {
        email: "usuario@test.com",
        username: "usuario",
        first_name: "Usuario",
        last_name: "Base",
        role: Role::BaseUser,
        password: "usuario123",
    },
    SeedUser {
        email: "maria.garcia@test.com",
        username: "maria.garcia",
        first_name: "María",
        last_name: "García",
        role: Role::BaseUser,
        password: "maria123",
    },
];

const SAMPLE_PDF: &str = "actas/acta_ejemplo.pdf";

/// (title, status, index into USERS of the creator, document)
const ACTAS: [(&str, ActaStatus, usize, Option<&str>); 6] = [
    ("Reunión de planificación Q1 2024", ActaStatus::Pending, 0, Some(SAMPLE_PDF)),
    ("Revisión de presupuesto anual", ActaStatus::InProgress, 1, None),
    ("Capacitación de equipo técnico", ActaStatus::Completed, 0, Some(SAMPLE_PDF)),
    ("Revisión de seguridad informática", ActaStatus::Pending, 2, None),
    ("Implementación de nuevas políticas", ActaStatus::InProgress, 1, None),
    ("Evaluación de desempeño anual", ActaStatus::Completed, 2, None),
];

/// (index into ACTAS, description, responsible party, due date offset in days)
const COMPROMISOS: [(usize, &str, &str, i64); 11] = [
    (0, "Definir objetivos del primer trimestre", "Juan Pérez", 15),
    (0, "Asignar recursos para nuevos proyectos", "Usuario Base", 30),
    (1, "Revisar gastos operativos del año anterior", "Carlos López", 7),
    (2, "Organizar sesiones de capacitación mensuales", "Ana Martínez", 45),
    (3, "Realizar auditoría de sistemas", "Usuario Base", 20),
    (3, "Actualizar políticas de contraseñas", "María García", 10),
    (4, "Implementar nuevo sistema de reportes", "Carlos López", 35),
    (4, "Capacitar personal en nuevos procedimientos", "María García", 25),
    (5, "Completar evaluaciones individuales", "Ana Martínez", -5),
    (5, "Generar informe consolidado de evaluaciones", "Usuario Base", -2),
    (0, "Revisar y aprobar nuevos contratos", "María García", 12),
];

fn offset_date(today: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        today.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        today.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(today)
}

async fn ensure_user(repo: &dyn Repository, seed: &SeedUser) -> Result<User, SeedError> {
    if let Some(existing) = repo.find_user_by_email(seed.email).await? {
        return Ok(existing);
    }
    let user = repo
        .create_user(NewUser {
            email: seed.email.to_string(),
            username: seed.username.to_string(),
            first_name: seed.first_name.to_string(),
            last_name: seed.last_name.to_string(),
            role: seed.role,
            password_hash: hash_password(seed.password)?,
        })
        .await?;
    tracing::info!(email = seed.email, "user created");
    Ok(user)
}

async fn ensure_acta(repo: &dyn Repository, acta: NewActa) -> Result<i64, SeedError> {
    if let Some(existing) = repo.find_acta_by_title(&acta.title).await? {
        return Ok(existing.id);
    }
    validate_new_acta(&acta).map_err(|errors| SeedError::Invalid {
        record: acta.title.clone(),
        errors,
    })?;
    let title = acta.title.clone();
    let created = repo.create_acta(acta).await?;
    tracing::info!(acta_id = created.id, title = %title, "acta created");
    Ok(created.id)
}

async fn ensure_compromiso(repo: &dyn Repository, compromiso: NewCompromiso) -> Result<(), SeedError> {
    if repo
        .find_compromiso(compromiso.acta_id, &compromiso.description)
        .await?
        .is_some()
    {
        return Ok(());
    }
    validate_new_compromiso(&compromiso).map_err(|errors| SeedError::Invalid {
        record: compromiso.description.clone(),
        errors,
    })?;
    let created = repo.create_compromiso(compromiso).await?;
    tracing::info!(compromiso_id = created.id, acta_id = created.acta_id, "compromiso created");
    Ok(())
}

/// main
///
/// Loads demo users, Actas and Compromisos. Safe to run repeatedly: users are
/// matched by email, Actas by title and Compromisos by (Acta, description).
#[tokio::main]
async fn main() -> Result<(), SeedError> {
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "load_data=info,actas_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.db_url)
        .await?;
    let repo = PostgresRepository::new(pool);
    repo.migrate().await?;

    let mut users = Vec::with_capacity(USERS.len());
    for seed in &USERS {
        users.push(ensure_user(&repo, seed).await?);
    }

    let mut acta_ids = Vec::with_capacity(ACTAS.len());
    for (title, status, creator, document) in ACTAS {
        let id = ensure_acta(
            &repo,
            NewActa {
                title: title.to_string(),
                status,
                document: document.map(str::to_string),
                creator_id: Some(users[creator].id),
            },
        )
        .await?;
        acta_ids.push(id);
    }

    let today = Utc::now().date_naive();
    for (acta, description, responsible_party, offset) in COMPROMISOS {
        ensure_compromiso(
            &repo,
            NewCompromiso {
                acta_id: acta_ids[acta],
                description: description.to_string(),
                responsible_party: responsible_party.to_string(),
                due_date: offset_date(today, offset),
            },
        )
        .await?;
    }

    tracing::info!("Datos de ejemplo cargados exitosamente");
    Ok(())
}
