use std::{env, error::Error};

use async_trait::async_trait;
use directory::database::{Database, DatabaseTransaction, Result};
use queries::convert_error;
use sqlx::{postgres::PgPoolOptions, Transaction};

pub mod data_model;
pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

impl Default for DatabaseConnectionInfo {
    fn default() -> Self {
        Self {
            username: "postgres".to_owned(),
            password: String::new(),
            hostname: "localhost".to_owned(),
            port: 5432,
            database: "pharmabenin".to_owned(),
        }
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
}

pub struct PgDatabaseTransaction<'a> {
    tx: Transaction<'a, sqlx::Postgres>,
}

#[async_trait]
impl<'a> DatabaseTransaction for PgDatabaseTransaction<'a> {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(convert_error)
    }
}

pub struct PgDatabaseAutocommit {
    pool: sqlx::PgPool,
}

impl PgDatabase {
    /// Connects right away and runs pending migrations.
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        let url = database_connection_info.postgres_url();
        let pool = sqlx::postgres::PgPool::connect(&url).await?;

        let database = Self { connection: pool };
        database.migrate().await?;

        Ok(database)
    }

    /// Opens connections on first use only. Migrations have to be run
    /// separately with [`PgDatabase::migrate`].
    pub fn connect_lazy(
        database_connection_info: DatabaseConnectionInfo,
    ) -> std::result::Result<Self, sqlx::Error> {
        let url = database_connection_info.postgres_url();
        let pool = PgPoolOptions::new().connect_lazy(&url)?;
        Ok(Self { connection: pool })
    }

    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        log::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.connection).await
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Transaction = PgDatabaseTransaction<'static>;
    type Autocommit = PgDatabaseAutocommit;

    fn auto(&self) -> Self::Autocommit {
        PgDatabaseAutocommit {
            pool: self.connection.clone(),
        }
    }

    async fn transaction(&self) -> Result<Self::Transaction> {
        let tx: Transaction<'_, sqlx::Postgres> =
            self.connection.begin().await.map_err(convert_error)?;

        Ok(PgDatabaseTransaction { tx })
    }
}
