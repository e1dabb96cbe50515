use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod query;
pub mod repositories;

pub use query::{PageWindow, Paged, paged_query, query_raw};
pub use repositories::episode::EpisodeRepository;
pub use repositories::genre::GenreRepository;
pub use repositories::season::SeasonRepository;
pub use repositories::series::{PersonalRating, SeriesRepository, SeriesView};
pub use repositories::user::{User, UserRepository};
pub use repositories::user_series::{Slot, UserSeriesRepository};

/// Failures a repository reports to its callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("already exists")]
    Duplicate,

    /// The row, or a row it references, does not exist.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Db(DbErr),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => return Self::Duplicate,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Self::NotFound,
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => Self::NotFound,
            other => Self::Db(other),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[must_use]
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn series(&self) -> SeriesRepository {
        SeriesRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn seasons(&self) -> SeasonRepository {
        SeasonRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn episodes(&self) -> EpisodeRepository {
        EpisodeRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn genres(&self) -> GenreRepository {
        GenreRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_series(&self) -> UserSeriesRepository {
        UserSeriesRepository::new(self.conn.clone())
    }
}
