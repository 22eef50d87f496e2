//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use folio_api::{ApiState, Authenticator};
use folio_core::FolioConfig;
use folio_engine::Engine;
use folio_media::{BlobStore, FsBlobStore, MemoryBlobStore};
use folio_store::{DocumentStore, RedbDocumentStore};
use tracing::{info, warn};

const CONFIG_FILE: &str = "folio.toml";

/// Read the configuration file, apply `FOLIO_*` overrides, and validate.
///
/// With `in_memory` a missing file is fine: everything can come from the
/// environment.
fn load_config(path: &Path, in_memory: bool) -> anyhow::Result<FolioConfig> {
    let mut config = if in_memory && !path.exists() {
        FolioConfig::default()
    } else {
        FolioConfig::from_file(path)?
    };
    config.apply_env();
    config.validate(!in_memory)?;
    Ok(config)
}

fn open_engine(config: &FolioConfig, in_memory: bool) -> anyhow::Result<Engine> {
    let base_url = config.media_base_url();
    let (store, blobs): (Arc<dyn DocumentStore>, Arc<dyn BlobStore>) = if in_memory {
        warn!("running on in-memory stores; data is lost on exit");
        (
            Arc::new(RedbDocumentStore::open_in_memory()?),
            Arc::new(MemoryBlobStore::new(base_url)),
        )
    } else {
        let (Some(db_path), Some(media_root)) = (&config.store.path, &config.media.root) else {
            bail!("store.path and media.root are required");
        };
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let store = RedbDocumentStore::open(db_path)?;
        info!(path = ?db_path, "document store opened");
        let blobs = FsBlobStore::new(media_root, base_url)?;
        info!(root = ?media_root, %base_url, "blob store opened");
        (Arc::new(store), Arc::new(blobs))
    };
    Ok(Engine::new(store, blobs, config.timeout()))
}

pub async fn serve(config_path: &Path, listen: Option<String>, in_memory: bool) -> anyhow::Result<()> {
    info!("Folio daemon starting");

    let mut config = load_config(config_path, in_memory)?;
    if let Some(listen) = listen {
        config.server.listen = listen;
    }

    let engine = open_engine(&config, in_memory)?;
    engine.init().await?;

    let drift = engine.registry().reconcile().await?;
    if !drift.is_clean() {
        warn!(
            missing = ?drift.missing_storage,
            orphaned = ?drift.orphaned_storage,
            "collection definitions and storage have drifted; run `foliod reconcile`"
        );
    }

    let login_hash = config.auth.login_hash.as_deref().unwrap_or_default();
    let state = ApiState {
        engine,
        auth: Authenticator::new(login_hash)?,
    };
    let router = folio_api::build_router(state, &config.server.api_prefix);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;
    info!(addr = %listener.local_addr()?, prefix = %config.server.api_prefix, "API server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("Folio daemon stopped");
    Ok(())
}

pub async fn reconcile(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path, false)?;
    let engine = open_engine(&config, false)?;
    engine.init().await?;
    let report = engine.registry().reconcile().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_clean() {
        warn!("drift detected");
    }
    Ok(())
}

pub fn init(dir: &Path, force: bool) -> anyhow::Result<()> {
    let target = dir.join(CONFIG_FILE);
    if target.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", target.display());
    }
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let config = FolioConfig::scaffold(dir);
    std::fs::write(&target, config.to_toml_string()?)
        .with_context(|| format!("writing {}", target.display()))?;
    println!("wrote {}", target.display());
    println!("set auth.login_hash (see `foliod hash-password`) before serving");
    Ok(())
}
