pub mod cli;
pub mod core;
pub mod providers;
pub mod server;
pub mod store;

use crate::core::auth::AdminAuth;
use crate::core::cache::Store;
use crate::core::config::{AppConfig, StoreProvider};
use crate::core::draft::{DRAFTS_COLLECTION, DraftCache};
use crate::core::editor::AdminEditor;
use crate::core::rate::RateStore;
use crate::core::sync::RateSyncService;
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Serve {
        bind: Option<String>,
    },
    Convert {
        period: Option<String>,
        amounts: Vec<(String, String)>,
        jcb_usd: Option<String>,
    },
    Admin,
}

/// Builds the rate store selected by the configuration.
pub fn build_rate_store(config: &AppConfig) -> Result<Arc<dyn RateStore>> {
    match config.store.provider {
        StoreProvider::Postgrest => {
            let base_url = config
                .store
                .base_url
                .as_deref()
                .context("store.base_url is required for the postgrest provider")?;
            let api_key = config.store.resolved_api_key().with_context(|| {
                format!(
                    "store.api_key (or {}) is required for the postgrest provider",
                    crate::core::config::API_KEY_ENV
                )
            })?;
            info!(%base_url, table = %config.store.table, "Using PostgREST rate store");
            Ok(Arc::new(providers::PostgrestRateStore::new(
                base_url,
                &api_key,
                &config.store.table,
            )?))
        }
        StoreProvider::Memory => {
            warn!("Using in-memory rate store; rates are lost on exit");
            Ok(Arc::new(providers::MemoryRateStore::new()))
        }
    }
}

/// Opens the draft collection, on disk when possible.
pub fn build_draft_cache(config: &AppConfig) -> Result<DraftCache> {
    let store = match config.default_data_path() {
        Ok(path) => KeyValueStore::open(&path),
        Err(e) => {
            warn!(error = %e, "No data directory available");
            KeyValueStore::in_memory()
        }
    };
    let collection = store
        .get_collection(DRAFTS_COLLECTION, true)
        .or_else(|| {
            warn!("Drafts will not survive this session");
            store.get_collection(DRAFTS_COLLECTION, false)
        })
        .context("Failed to open draft storage")?;
    Ok(DraftCache::new(collection))
}

fn admin_auth(config: &AppConfig) -> AdminAuth {
    match &config.admin {
        Some(admin) => AdminAuth::new(Some(admin.password.clone()), admin.session_ttl_secs),
        None => AdminAuth::new(None, 0),
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    run_with_config(command, &config).await
}

pub async fn run_with_config(command: AppCommand, config: &AppConfig) -> Result<()> {
    debug!(provider = ?config.store.provider, default_period = %config.default_period, "Loaded config");
    let service = RateSyncService::new(build_rate_store(config)?, config.default_period.clone());

    match command {
        AppCommand::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let state = Arc::new(server::AppState {
                service,
                auth: admin_auth(config),
            });
            server::serve(state, &bind).await
        }
        AppCommand::Convert {
            period,
            amounts,
            jcb_usd,
        } => cli::convert::run(&service, period.as_deref(), &amounts, jcb_usd.as_deref()).await,
        AppCommand::Admin => {
            let auth = admin_auth(config);
            let needs_password = auth.is_enabled();
            let mut editor = AdminEditor::new(service, build_draft_cache(config)?, auth);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            cli::admin::run_shell(&mut editor, stdin, &mut stdout, needs_password).await
        }
    }
}
