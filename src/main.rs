use std::error::Error;
use std::sync::Arc;

use slog::{info, warn};
use warp::Filter;

use rides_backend::config::{get_optional_variable, get_variable};
use rides_backend::environment::{Environment, SharedStore};
use rides_backend::log::initialize_logger;
use rides_backend::routes;
use rides_backend::store::memory::MemoryRideStore;
use rides_backend::store::PgRideStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let port: u16 = get_variable("BACKEND_PORT")
        .parse()
        .expect("parse BACKEND_PORT as u16");

    info!(logger, "Starting..."; "port" => port);
    let logger = Arc::new(logger);

    let store: Arc<SharedStore> = match get_optional_variable("BACKEND_DB_CONNECTION_STRING") {
        Some(connection_string) => {
            info!(logger, "Creating database pool...");

            Arc::new(
                PgRideStore::connect(&connection_string)
                    .await
                    .expect("create database pool from BACKEND_DB_CONNECTION_STRING"),
            )
        }
        None => {
            warn!(
                logger,
                "BACKEND_DB_CONNECTION_STRING is not set; rides are kept in memory and lost on restart"
            );

            Arc::new(MemoryRideStore::new())
        }
    };

    let environment = Environment::new(logger.clone(), store);

    // The UI calls this function directly from the browser.
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec![
            "authorization",
            "x-client-info",
            "apikey",
            "content-type",
        ])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    let rejection_logger = logger.clone();
    let routes = routes::make_health_route(environment.clone())
        .or(routes::make_action_route(environment))
        .recover(move |r| routes::format_rejection(rejection_logger.clone(), r))
        .with(cors);

    let (_, server) =
        warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async {
            tokio::signal::ctrl_c()
                .await
                .expect("listen for shutdown signal");
        });

    server.await;

    info!(logger, "Exiting gracefully...");

    Ok(())
}
