//! PeopleDesk service binary

use anyhow::Context;
use peopledesk::agents::builtin_constructors;
use peopledesk::auth::SessionStore;
use peopledesk::config::AppConfig;
use peopledesk::orchestrator::Orchestrator;
use peopledesk::server::{build_router, AppContext};
use peopledesk::storage::{Database, UserStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("peopledesk=info,tower_http=info")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    let db = Database::connect(&config.database_url)
        .await
        .with_context(|| format!("opening database {}", config.database_url))?;

    let orchestrator =
        Arc::new(Orchestrator::bootstrap(builtin_constructors(config.clone(), db.clone())).await);
    let inventory = orchestrator.list_agents();
    info!(
        agents = inventory.total_agents,
        "orchestrator ready: {:?}", inventory.agents
    );

    let ctx = AppContext {
        config: config.clone(),
        orchestrator,
        users: UserStore::new(db.pool()),
        sessions: Arc::new(SessionStore::new()),
    };

    let app = build_router(ctx);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
