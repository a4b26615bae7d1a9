use std::{path::Path, time::SystemTime};

use warden_types::{CommandRow, CommandVerb, WipeKind};

use crate::{launch::Launch, registry::Registry, store::FleetStore, wipe};

/// Drains the command queue once: every row is dispatched in read order and
/// either resolved (deleted) or left untouched for a later tick. No verb ever
/// partially applies a destructive action.
pub async fn drain_queue<S: FleetStore, L: Launch>(
    store: &S,
    registry: &mut Registry,
    launcher: &L,
    data_root: &Path,
    now: SystemTime,
) {
    let rows = match store.fetch_commands().await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::error!(error = %err, "could not read the command queue");
            return;
        }
    };

    for row in rows {
        tracing::debug!(
            port = row.port,
            command = %row.raw,
            status = row.status,
            "executing queued command"
        );

        let resolved = match dispatch(store, registry, launcher, data_root, &row, now).await {
            Ok(resolved) => resolved,
            Err(err) => {
                // Leave the row queued; it is retried next tick.
                tracing::error!(port = row.port, command = %row.raw, error = %err, "command failed");
                continue;
            }
        };

        if resolved
            && let Err(err) = store.delete_command(row.port, &row.raw).await
        {
            tracing::error!(port = row.port, command = %row.raw, error = %err, "could not resolve command");
        }
    }
}

async fn dispatch<S: FleetStore, L: Launch>(
    store: &S,
    registry: &mut Registry,
    launcher: &L,
    data_root: &Path,
    row: &CommandRow,
    now: SystemTime,
) -> anyhow::Result<bool> {
    match CommandVerb::parse(&row.raw) {
        CommandVerb::Start => exec_start(store, registry, launcher, data_root, row.port).await,
        CommandVerb::Stop => {
            // Fire and forget; the queue does not wait for the exit.
            if let Some(instance) = registry.get_active_mut(row.port) {
                instance.send_stop(now).await;
            }
            Ok(true)
        }
        CommandVerb::Restart => {
            exec_restart(store, registry, launcher, data_root, row, now).await
        }
        CommandVerb::Wipe(kind) => exec_wipe(store, registry, data_root, row.port, kind).await,
        CommandVerb::Passthrough(text) => {
            if let Some(instance) = registry.get_active_mut(row.port) {
                if !instance.send_console(&text).await {
                    tracing::warn!(port = row.port, "console forward failed");
                }
            }
            Ok(true)
        }
    }
}

async fn exec_start<S: FleetStore, L: Launch>(
    store: &S,
    registry: &mut Registry,
    launcher: &L,
    data_root: &Path,
    port: u16,
) -> anyhow::Result<bool> {
    if registry.is_active(port) {
        // Already running; the command is satisfied as-is.
        return Ok(true);
    }
    if registry.is_pending_removal(port) {
        // The previous process is still draining; retry next tick.
        return Ok(false);
    }

    match launcher.launch(store, data_root, port).await {
        Ok(instance) => {
            registry.insert(instance);
            tracing::info!(port, "started instance");
        }
        Err(err) => {
            // Resolved without retry: a launch that cannot succeed would
            // otherwise wedge the queue. See DESIGN.md.
            tracing::error!(port, error = format!("{err:#}"), "failed to start instance");
        }
    }
    Ok(true)
}

/// The only two-phase verb: phase 0 issues the stop and rewrites the row to
/// phase 1; the row then waits until the port has fully drained before the
/// relaunch resolves it.
async fn exec_restart<S: FleetStore, L: Launch>(
    store: &S,
    registry: &mut Registry,
    launcher: &L,
    data_root: &Path,
    row: &CommandRow,
    now: SystemTime,
) -> anyhow::Result<bool> {
    let active = registry.is_active(row.port);

    if active && row.status == 0 {
        if let Some(instance) = registry.get_active_mut(row.port) {
            instance.send_stop(now).await;
        }
        store.set_command_status(row.port, &row.raw, 1).await?;
        return Ok(false);
    }

    if !active && !registry.is_pending_removal(row.port) {
        return exec_start(store, registry, launcher, data_root, row.port).await;
    }

    Ok(false)
}

async fn exec_wipe<S: FleetStore>(
    store: &S,
    registry: &Registry,
    data_root: &Path,
    port: u16,
    kind: WipeKind,
) -> anyhow::Result<bool> {
    if registry.is_active(port) {
        tracing::warn!(port, ?kind, "refusing to wipe a running instance");
        return Ok(true);
    }
    if registry.is_pending_removal(port) {
        return Ok(false);
    }

    let level_name = match kind {
        WipeKind::World => store
            .fetch_settings(port)
            .await?
            .map(|s| s.level_name)
            .unwrap_or_else(|| "world".to_string()),
        _ => "world".to_string(),
    };

    if let Err(err) = wipe::wipe_workspace(data_root, port, kind, &level_name).await {
        tracing::error!(port, ?kind, error = %err, "wipe failed");
    }
    Ok(true)
}
