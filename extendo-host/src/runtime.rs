use std::sync::Arc;

use extendo_blackiya::{
    ConnectionManager, EventProcessor, SharedSyncState, SyncManager, TokioScheduler,
    TranslationsClient,
};
use extendo_excerpt::CompilationClient;
use extendo_storage::{JsonFileStore, SettingsStore};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use crate::bridge::{spawn_writer, HostEvent, NativeBridge};
use crate::config::HostConfig;
use crate::errors::{FrameError, HostError};
use crate::frame::read_message;
use crate::protocol::{HostFrame, RelayFrame};

const RELAY_CLOSED: &str = "native messaging relay closed";

/// Runs the host over stdin/stdout until the relay goes away.
pub async fn run_host(config: HostConfig) -> Result<(), HostError> {
    serve(config, tokio::io::stdin(), tokio::io::stdout()).await
}

pub async fn serve<R, W>(config: HostConfig, mut reader: R, writer: W) -> Result<(), HostError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let store = Arc::new(JsonFileStore::open(&config.store_path).await?);
    info!(path = %store.path().display(), "opened settings store");
    let settings = Arc::new(SettingsStore::new(store));
    apply_seeds(&settings, &config).await?;

    let (bridge, outbound) = NativeBridge::new(config.peer_timeout);
    let bridge = Arc::new(bridge);
    let writer_task = spawn_writer(writer, outbound);

    let state = SharedSyncState::new();
    let sink = Arc::new(TranslationsClient::new(settings.clone(), config.http_timeout)?);
    let processor = EventProcessor::new(state.clone(), sink, settings.clone(), &config.sync);
    let transport = Arc::new(ConnectionManager::new(bridge.clone(), processor, &config.sync));
    let (scheduler, mut alarms) = TokioScheduler::new();
    let manager = SyncManager::new(
        config.sync.clone(),
        settings.clone(),
        transport,
        Arc::new(scheduler),
        state,
    );
    let excerpts = CompilationClient::new(settings, config.http_timeout)?;

    tokio::spawn({
        let manager = manager.clone();
        async move { manager.init().await }
    });
    let alarm_task = tokio::spawn({
        let manager = manager.clone();
        async move {
            while let Some(alarm) = alarms.recv().await {
                manager.handle_alarm(&alarm).await;
            }
        }
    });

    let outcome = loop {
        match read_message::<_, RelayFrame>(&mut reader).await {
            Ok(Some(frame)) => {
                if let Some(event) = bridge.route(frame) {
                    dispatch(event, &manager, &excerpts, &bridge);
                }
            }
            Ok(None) => {
                info!("relay closed input; shutting down");
                break Ok(());
            }
            Err(FrameError::Json(err)) => {
                warn!(error = %err, "dropping malformed relay frame");
            }
            Err(err) => break Err(HostError::from(err)),
        }
    };

    bridge.disconnect_all(Some(RELAY_CLOSED.into()));
    alarm_task.abort();
    writer_task.abort();
    outcome
}

async fn apply_seeds(settings: &SettingsStore, config: &HostConfig) -> Result<(), HostError> {
    if let Some(peer_id) = &config.blackiya_extension_id {
        settings.save_blackiya_extension_id(peer_id).await?;
        info!(peer_id = %peer_id, "seeded Blackiya extension id");
    }
    if let Some(api) = &config.translations_api {
        settings.save_translations_api_instance(api).await?;
        info!(endpoint = %api, "seeded translations API instance");
    }
    Ok(())
}

fn dispatch(
    event: HostEvent,
    manager: &SyncManager,
    excerpts: &CompilationClient,
    bridge: &Arc<NativeBridge>,
) {
    match event {
        HostEvent::Lifecycle(reason) => {
            let manager = manager.clone();
            tokio::spawn(async move { manager.ensure_connected_and_reconciled(reason).await });
        }
        HostEvent::Alarm(alarm) => {
            let manager = manager.clone();
            tokio::spawn(async move { manager.handle_alarm(&alarm).await });
        }
        HostEvent::RuntimeMessage {
            request_id,
            message,
        } => {
            let excerpts = excerpts.clone();
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let response = excerpts
                    .handle_runtime_message(&message)
                    .await
                    .and_then(|response| serde_json::to_value(response).ok())
                    .unwrap_or(Value::Null);
                if !bridge.send(HostFrame::RuntimeResponse {
                    request_id,
                    response,
                }) {
                    warn!("relay gone before runtime response was sent");
                }
            });
        }
    }
}
