use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use url::Url;

use top10::api::{AppState, run_api};
use top10::auth::SessionManager;
use top10::backend::{HostedBackend, LocalBackend, MagicLinkAuth, Tables};
use top10::config::{self, Backend, Config};
use top10::draft::DraftStore;
use top10::supervisor::Supervisor;
use top10::toast::ToastBoard;
use top10::{db, metrics_exporter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,top10=debug")),
        )
        .init();

    let mut config = config::loader::load_with_discovery()?;
    config.apply_env_overrides();

    metrics_exporter::init_metrics()?;

    let (tables, auth) = build_backend(&config).await?;
    let drafts = DraftStore::new(&config.drafts.dir, config.drafts.debounce())?;

    let state = AppState {
        tables,
        auth,
        sessions: SessionManager::new(),
        drafts: drafts.clone(),
        toasts: ToastBoard::default(),
        public_url: config.public_base().to_string(),
    };

    let mut supervisor = Supervisor::new();
    let bind = config.server.bind.clone();
    supervisor.spawn("api", move |shutdown| run_api(state, bind, shutdown));
    supervisor.spawn("drafts", move |shutdown| drafts.run_flusher(shutdown));
    supervisor.run().await
}

async fn build_backend(config: &Config) -> Result<(Arc<dyn Tables>, Arc<dyn MagicLinkAuth>)> {
    match &config.backend {
        Backend::Local { db_path } => {
            let pool = db::init_pool(db_path).await?;
            let backend = Arc::new(LocalBackend::new(pool));
            let pruned = backend.prune_expired_links().await?;
            tracing::info!(
                path = %db_path.display(),
                pruned,
                "using local backend; sign-in links are logged"
            );
            let tables: Arc<dyn Tables> = backend.clone();
            let auth: Arc<dyn MagicLinkAuth> = backend;
            Ok((tables, auth))
        }
        Backend::Hosted { url, anon_key_env } => {
            let base_url =
                Url::parse(url).with_context(|| format!("invalid backend url: {url}"))?;
            let anon_key = std::env::var(anon_key_env)
                .with_context(|| format!("{anon_key_env} environment variable must be set"))?;
            let backend = Arc::new(HostedBackend::new(base_url, anon_key)?);
            tracing::info!(%url, "using hosted backend");
            let tables: Arc<dyn Tables> = backend.clone();
            let auth: Arc<dyn MagicLinkAuth> = backend;
            Ok((tables, auth))
        }
    }
}
