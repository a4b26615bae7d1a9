use std::path::Path;

use warden_types::WipeKind;

use crate::paths;

/// Removes the workspace subtree a wipe command names. Missing directories
/// count as already wiped.
pub async fn wipe_workspace(
    root: &Path,
    port: u16,
    kind: WipeKind,
    level_name: &str,
) -> std::io::Result<()> {
    let dir = match kind {
        WipeKind::Total => paths::instance_dir(root, port),
        WipeKind::World => paths::world_dir(root, port, level_name),
        WipeKind::Plugins => paths::plugins_dir(root, port),
        WipeKind::Logs => paths::logs_dir(root, port),
    };

    match tokio::fs::remove_dir_all(&dir).await {
        Ok(()) => {
            tracing::info!(port, dir = %dir.display(), "wiped workspace path");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scaffold(root: &Path, port: u16) {
        for dir in [
            paths::world_dir(root, port, "alpha"),
            paths::plugins_dir(root, port),
            paths::logs_dir(root, port),
        ] {
            tokio::fs::create_dir_all(dir).await.unwrap();
        }
    }

    #[tokio::test]
    async fn total_removes_whole_instance_dir() {
        let tmp = tempfile::tempdir().unwrap();
        scaffold(tmp.path(), 25565).await;

        wipe_workspace(tmp.path(), 25565, WipeKind::Total, "alpha")
            .await
            .unwrap();
        assert!(!paths::instance_dir(tmp.path(), 25565).exists());
    }

    #[tokio::test]
    async fn world_removes_only_the_named_level() {
        let tmp = tempfile::tempdir().unwrap();
        scaffold(tmp.path(), 25565).await;

        wipe_workspace(tmp.path(), 25565, WipeKind::World, "alpha")
            .await
            .unwrap();
        assert!(!paths::world_dir(tmp.path(), 25565, "alpha").exists());
        assert!(paths::plugins_dir(tmp.path(), 25565).exists());
        assert!(paths::logs_dir(tmp.path(), 25565).exists());
    }

    #[tokio::test]
    async fn missing_directory_counts_as_wiped() {
        let tmp = tempfile::tempdir().unwrap();
        wipe_workspace(tmp.path(), 40000, WipeKind::Plugins, "world")
            .await
            .unwrap();
    }
}
