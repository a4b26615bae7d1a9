use std::path::{Path, PathBuf};

/// Root of all instance workspaces. Defaults to `./servers` next to the
/// agent, matching the layout the provisioner and wiper assume.
pub fn data_root() -> PathBuf {
    std::env::var("WARDEN_DATA_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("servers"))
}

/// Shared directory the known server jars are staged from.
pub fn jars_dir(root: &Path) -> PathBuf {
    root.join("jars")
}

pub fn instance_dir(root: &Path, port: u16) -> PathBuf {
    root.join(format!("server_{port}"))
}

pub fn world_dir(root: &Path, port: u16, level_name: &str) -> PathBuf {
    instance_dir(root, port).join(safe_level_name(level_name))
}

pub fn plugins_dir(root: &Path, port: u16) -> PathBuf {
    instance_dir(root, port).join("plugins")
}

pub fn logs_dir(root: &Path, port: u16) -> PathBuf {
    instance_dir(root, port).join("logs")
}

/// Level names come from the database; anything that is not a plain single
/// path segment falls back to the default so a wipe can never traverse out
/// of the instance directory.
pub fn safe_level_name(level_name: &str) -> &str {
    let suspicious = level_name.is_empty()
        || level_name == "."
        || level_name == ".."
        || level_name.contains('/')
        || level_name.contains('\\');
    if suspicious { "world" } else { level_name }
}
