use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use readyboard_core::submission::{MemorySubmissionStore, SubmissionStore};
use readyboard_daemon::api::{self, AppState};
use readyboard_daemon::config::Cli;
use readyboard_daemon::gateway::{HttpGateway, HttpVoiceClassifier};
use readyboard_daemon::history::FileSubmissionStore;
use readyboard_daemon::ports::RemoteClassifier;
use readyboard_daemon::probes::Collaborators;
use readyboard_daemon::scheduler::spawn_scheduler;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::new(&cli.log))
        .init();

    let config = cli.into_config()?;
    info!(
        listen = %config.listen,
        gateway = %config.gateway_url,
        targets = config.targets.len(),
        policy = ?config.reduce_policy,
        "starting daemon"
    );

    let gateway = Arc::new(HttpGateway::new(&config.gateway_url, config.probe_timeout)?);
    let collaborators = Collaborators {
        functions: gateway.clone(),
        endpoints: gateway.clone(),
        models: gateway,
    };

    let remote: Option<Arc<dyn RemoteClassifier>> = match &config.voice_url {
        Some(url) => {
            let classifier: Arc<dyn RemoteClassifier> =
                Arc::new(HttpVoiceClassifier::new(url, config.classify_timeout)?);
            Some(classifier)
        }
        None => None,
    };

    let history: Arc<dyn SubmissionStore> = match &config.history_file {
        Some(path) => Arc::new(
            FileSubmissionStore::open(path, config.history_max)
                .with_context(|| format!("open history file {}", path.display()))?,
        ),
        None => Arc::new(MemorySubmissionStore::new(config.history_max)),
    };

    let state = AppState::build(&config, collaborators, remote, history)?;
    let scheduler = spawn_scheduler(state.clone());
    let app = api::router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("bind {}", config.listen))?;
    info!("listening on http://{}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    state.provisioning.teardown(config.teardown_grace).await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown requested");
}
