use campus::logging::init_tracing;
use campus::{init_app_state, init_router};
use dotenvy::dotenv;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let state = match init_app_state().await {
        Ok(state) => state,
        Err(e) => {
            error!(error = ?e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };
    let app = init_router(state);

    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!(addr = %addr, "Server running");
    info!("Swagger UI available at /swagger-ui, Scalar at /scalar");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
