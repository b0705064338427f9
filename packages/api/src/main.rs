use lambda_http::{run, Error};
use std::env::set_var;
use std::sync::Arc;
use tracing::info;

use matching_api::{create_app, state::AppState};
use matching_core::config::{MatchingConfig, StoreBackend};
use matching_core::store::{DynamoDbStore, InMemoryStore, KeyValueStore};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = MatchingConfig::from_env()?;

    let store: Arc<dyn KeyValueStore> = match &config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Arc::new(InMemoryStore::default())
        }
        StoreBackend::DynamoDb { table_name } => {
            info!("Using DynamoDB table {}", table_name);
            let aws_config = aws_config::load_from_env().await;
            let client = aws_sdk_dynamodb::Client::new(&aws_config);
            Arc::new(DynamoDbStore::new(client, table_name.clone()))
        }
    };

    let app = create_app(AppState::from_config(&config, store)?);

    if std::env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        set_var("AWS_LAMBDA_HTTP_IGNORE_STAGE_IN_PATH", "true");
        info!("Starting matching API on Lambda");
        return run(app).await;
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Matching API listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
