use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use warden_types::InstanceSettings;

use crate::{paths, process::LaunchSpec};

/// Snapshot of what was actually spawned, written into the workspace for
/// operators debugging a dead instance.
#[derive(Debug, serde::Serialize)]
struct LaunchSnapshot<'a> {
    port: u16,
    started_at_unix_ms: u64,
    agent_version: &'static str,
    #[serde(flatten)]
    spec: &'a LaunchSpec,
}

/// Prepares the instance workspace: directory, `server.properties` from the
/// settings row, and the staged server jar. Returns the workspace directory.
pub async fn prepare_workspace(root: &Path, settings: &InstanceSettings) -> anyhow::Result<PathBuf> {
    let dir = paths::instance_dir(root, settings.port);
    tokio::fs::create_dir_all(&dir)
        .await
        .context("create instance dir")?;

    write_server_properties(&dir, settings)
        .await
        .context("write server.properties")?;
    stage_server_jar(root, &dir, &settings.jar)
        .await
        .context("stage server jar")?;

    Ok(dir)
}

pub fn render_server_properties(settings: &InstanceSettings) -> String {
    let pairs: Vec<(&str, String)> = vec![
        ("difficulty", settings.difficulty.to_string()),
        ("enable-rcon", "false".to_string()),
        ("gamemode", settings.gamemode.to_string()),
        ("level-name", paths::safe_level_name(&settings.level_name).to_string()),
        ("level-seed", settings.level_seed.clone()),
        ("level-type", settings.level_type.clone()),
        ("max-players", settings.max_players.to_string()),
        ("motd", settings.motd.clone()),
        ("online-mode", settings.online_mode.to_string()),
        ("pvp", settings.pvp.to_string()),
        ("query.port", settings.port.to_string()),
        ("server-ip", "127.0.0.1".to_string()),
        ("server-port", settings.port.to_string()),
        ("snooper-enabled", "false".to_string()),
        ("view-distance", settings.view_distance.to_string()),
        ("white-list", settings.whitelist.to_string()),
    ];

    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push('=');
        out.push_str(&value);
        out.push('\n');
    }
    out
}

async fn write_server_properties(dir: &Path, settings: &InstanceSettings) -> std::io::Result<()> {
    tokio::fs::write(dir.join("server.properties"), render_server_properties(settings)).await
}

/// Copies a known jar from the shared jars directory into the workspace as
/// `mc.jar`. Unknown jar names are left to the operator to stage by hand.
async fn stage_server_jar(root: &Path, dir: &Path, jar: &str) -> anyhow::Result<()> {
    if jar != "vanilla.jar" && jar != "bukkit.jar" {
        tracing::debug!(jar, "not a managed jar; skipping staging");
        return Ok(());
    }

    let source = paths::jars_dir(root).join(jar);
    let destination = dir.join("mc.jar");
    tokio::fs::copy(&source, &destination)
        .await
        .with_context(|| format!("copy {} to {}", source.display(), destination.display()))?;
    Ok(())
}

/// Best-effort atomic write of `launch.json` next to the instance.
pub async fn write_launch_snapshot(
    dir: &Path,
    port: u16,
    spec: &LaunchSpec,
) -> anyhow::Result<()> {
    let started_at_unix_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let snapshot = LaunchSnapshot {
        port,
        started_at_unix_ms,
        agent_version: env!("CARGO_PKG_VERSION"),
        spec,
    };

    let data = serde_json::to_vec_pretty(&snapshot).context("serialize launch.json")?;
    let path = dir.join("launch.json");
    let tmp = dir.join("launch.json.tmp");

    let mut f = tokio::fs::File::create(&tmp)
        .await
        .context("create launch.json.tmp")?;
    f.write_all(&data).await.context("write launch.json.tmp")?;
    f.flush().await.ok();
    tokio::fs::rename(&tmp, &path)
        .await
        .context("persist launch.json")?;
    Ok(())
}
