use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dynamo_console::config::Settings;
use dynamo_console::proxy::{DemoPolicy, Dispatcher};
use dynamo_console::server::{self, AppState};
use dynamo_console::session::{FileStorage, ProfileStore};
use dynamo_console::static_files::StaticFiles;
use tracing::{info, warn};

use crate::cli::ServeArgs;

/// Flags win over file and environment settings.
fn apply_overrides(settings: &mut Settings, args: ServeArgs) -> Result<()> {
    if let Some(listen) = args.listen {
        settings.listen_addr = listen;
    }
    if let Some(root) = args.static_root {
        settings.static_root = root;
    }
    if let Some(region) = args.region {
        settings.dynamodb.region = region;
    }
    if args.demo {
        settings.demo.enabled = true;
    }

    if let Some(name) = args.profile {
        let store = ProfileStore::new(FileStorage::in_config_dir()?);
        let Some(profile) = store.find_by_name(&name)? else {
            bail!("no saved profile named {name:?}");
        };
        info!(profile = %profile.name, endpoint = %profile.endpoint, "Using saved profile");
        settings.dynamodb.endpoint_url = Some(profile.endpoint);
    }
    if let Some(endpoint) = args.endpoint {
        settings.dynamodb.endpoint_url = Some(endpoint);
    }

    settings.validate()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

pub async fn execute(mut settings: Settings, args: ServeArgs) -> Result<()> {
    apply_overrides(&mut settings, args)?;

    let addr = settings.listen_addr()?;
    let clients = super::regional_clients(&settings.dynamodb).await;
    let dispatcher = Dispatcher::new(DemoPolicy::new(
        settings.demo.enabled,
        settings.demo.protected_tables.iter().cloned(),
    ));
    let files = StaticFiles::new(&settings.static_root, settings.not_found_page());

    info!(
        region = %settings.dynamodb.region,
        endpoint = ?settings.dynamodb.endpoint_url,
        static_root = %settings.static_root.display(),
        demo = settings.demo.enabled,
        "Starting console backend"
    );

    let listener = std::net::TcpListener::bind(addr)
        .with_context(|| format!("Failed to bind {addr}"))?;
    let state = Arc::new(AppState::new(dispatcher, Arc::new(clients), files));

    server::run(listener, state, shutdown_signal()).await
}
