use std::{env, path::PathBuf, process::ExitCode};

use database::{DatabaseConnectionInfo, PgDatabase};
use directory::client::Client;
use seed::{default_manifest_path, run, MANIFEST_VAR};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let Some(database_connection_info) = DatabaseConnectionInfo::from_env() else {
        log::error!("expected database connection info in env.");
        return ExitCode::FAILURE;
    };
    let database = match PgDatabase::connect(database_connection_info).await {
        Ok(database) => database,
        Err(why) => {
            log::error!("could not connect to database: {}", why);
            return ExitCode::FAILURE;
        }
    };

    let manifest = env::var(MANIFEST_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_manifest_path());

    match run(&Client::new(database), &manifest).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(why) => {
            log::error!("seeding failed: {}", why);
            ExitCode::FAILURE
        }
    }
}
