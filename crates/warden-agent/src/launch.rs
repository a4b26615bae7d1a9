use std::path::Path;

use anyhow::Context;
use warden_types::InstanceSettings;

use crate::{
    instance::Instance,
    process::{LaunchSpec, ProcessHandle},
    provision,
    store::FleetStore,
};

/// Seam between the command executor and instance creation. The production
/// implementation is [`Coordinator`]; tests substitute trivial children.
pub trait Launch: Send + Sync {
    async fn launch<S: FleetStore>(
        &self,
        store: &S,
        data_root: &Path,
        port: u16,
    ) -> anyhow::Result<Instance>;
}

/// Builds the spawn parameters for a provisioned workspace. Bukkit-family
/// jars take their own console flags; everything else runs headless vanilla.
pub fn launch_spec(dir: &Path, settings: &InstanceSettings) -> LaunchSpec {
    let mut args = vec![
        format!("-Xmx{}M", settings.memory_mb),
        "-jar".to_string(),
        "mc.jar".to_string(),
    ];
    if settings.jar == "bukkit.jar" {
        args.extend(["-o".to_string(), "true".to_string(), "-nojline".to_string()]);
    } else {
        args.push("nogui".to_string());
    }

    LaunchSpec {
        program: "java".to_string(),
        args,
        cwd: dir.to_path_buf(),
    }
}

/// Production launch path: resolve settings, provision the workspace, make
/// sure the log sink exists, spawn, and record the instance online with the
/// resume-on-restart flag cleared.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coordinator;

impl Launch for Coordinator {
    async fn launch<S: FleetStore>(
        &self,
        store: &S,
        data_root: &Path,
        port: u16,
    ) -> anyhow::Result<Instance> {
        let settings = store
            .fetch_settings(port)
            .await
            .context("fetch instance settings")?
            .with_context(|| format!("no settings row for port {port}"))?;

        let dir = provision::prepare_workspace(data_root, &settings)
            .await
            .context("provision workspace")?;
        store
            .ensure_log_table(port)
            .await
            .context("create log table")?;

        let spec = launch_spec(&dir, &settings);
        let (process, pump) = ProcessHandle::start(&spec)?;

        // The process is already running; bookkeeping failures must not turn
        // a successful launch into an orphan.
        if let Err(err) = provision::write_launch_snapshot(&dir, port, &spec).await {
            tracing::warn!(port, error = %err, "could not write launch snapshot");
        }
        if let Err(err) = store.set_status(port, true, false).await {
            tracing::warn!(port, error = %err, "could not mark instance online");
        }

        tracing::info!(port, program = %spec.program, cwd = %dir.display(), "instance launched");
        Ok(Instance::new(port, process, pump))
    }
}
