use std::process::ExitCode;

use database::{DatabaseConnectionInfo, PgDatabase};
use identity::HostedIdentityProvider;
use web::{config::Config, start_web_server, WebState};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let config = Config::from_env();

    // database
    let database_connection_info = DatabaseConnectionInfo::from_env().unwrap_or_else(|| {
        log::warn!("no database connection info in env, using the local defaults");
        DatabaseConnectionInfo::default()
    });
    let database = match PgDatabase::connect_lazy(database_connection_info) {
        Ok(database) => database,
        Err(why) => {
            log::error!("invalid database connection info: {}", why);
            return ExitCode::FAILURE;
        }
    };
    // the listing stays reachable and reports the outage while the store is down
    if let Err(why) = database.migrate().await {
        log::warn!("could not run database migrations: {}", why);
    }

    // identity provider
    let identity = HostedIdentityProvider::from_env();

    // web server
    let state = match WebState::new(database, identity, config.page_size) {
        Ok(state) => state,
        Err(why) => {
            log::error!("could not load templates: {:?}", why);
            return ExitCode::FAILURE;
        }
    };
    if let Err(why) = start_web_server(config, state).await {
        log::error!("web server stopped: {}", why);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
