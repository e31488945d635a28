pub mod postgres;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

pub use postgres::PostgresShareStore;
pub use sqlite::SqliteShareStore;
pub use store::ShareStore;

pub type DbStore = Arc<dyn ShareStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn from_url(database_url: &str) -> anyhow::Result<Self> {
        let scheme = database_url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();

        match scheme.as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            _ => anyhow::bail!("Unsupported DATABASE_URL scheme: {:?}", scheme),
        }
    }
}

/// Opens the store named by `database_url` and applies its migrations.
pub async fn create_store(database_url: &str) -> anyhow::Result<DbStore> {
    let store: DbStore = match Backend::from_url(database_url)? {
        Backend::Sqlite => Arc::new(SqliteShareStore::connect(database_url).await?),
        Backend::Postgres => Arc::new(PostgresShareStore::connect(database_url).await?),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_backend_from_scheme() {
        assert_eq!(
            Backend::from_url("sqlite://database.db?mode=rwc").unwrap(),
            Backend::Sqlite
        );
        assert_eq!(Backend::from_url("sqlite::memory:").unwrap(), Backend::Sqlite);
        assert_eq!(
            Backend::from_url("postgres://u:p@localhost/db").unwrap(),
            Backend::Postgres
        );
        assert_eq!(
            Backend::from_url("postgresql://localhost/db").unwrap(),
            Backend::Postgres
        );
        assert!(Backend::from_url("mysql://localhost/db").is_err());
        assert!(Backend::from_url("database.db").is_err());
    }
}
