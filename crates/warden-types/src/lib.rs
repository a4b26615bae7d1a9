use chrono::NaiveDate;

/// Which part of an instance workspace a wipe command removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WipeKind {
    /// The whole instance directory.
    Total,
    /// The world directory named by the settings row.
    World,
    Plugins,
    Logs,
}

/// A queued fleet command, parsed from the raw queue text.
///
/// The verb set is closed; any unrecognized text is forwarded verbatim to the
/// instance console as `Passthrough`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CommandVerb {
    Start,
    Stop,
    Restart,
    Wipe(WipeKind),
    Passthrough(String),
}

impl CommandVerb {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "restart" => Self::Restart,
            "wipe:total" => Self::Wipe(WipeKind::Total),
            "wipe:world" => Self::Wipe(WipeKind::World),
            "wipe:plugins" => Self::Wipe(WipeKind::Plugins),
            "wipe:logs" => Self::Wipe(WipeKind::Logs),
            other => Self::Passthrough(other.to_string()),
        }
    }
}

/// One row of the command queue.
///
/// `status` is meaningful only for the two-phase `restart` verb: 0 means the
/// stop has not been issued yet, 1 means the old process is draining.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CommandRow {
    pub port: u16,
    pub raw: String,
    pub status: i32,
}

/// Launch parameters for one instance, resolved from the settings table.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InstanceSettings {
    pub port: u16,
    /// Server jar name, e.g. `vanilla.jar` or `bukkit.jar`.
    pub jar: String,
    pub memory_mb: u32,
    pub level_name: String,
    pub level_seed: String,
    pub level_type: String,
    pub motd: String,
    pub max_players: u32,
    pub gamemode: i32,
    pub difficulty: i32,
    pub online_mode: bool,
    pub pvp: bool,
    pub whitelist: bool,
    pub view_distance: u32,
    /// Instances suspended before `today` are not resumed on supervisor
    /// restart. `None` means never suspended.
    pub suspended_until: Option<NaiveDate>,
}

impl InstanceSettings {
    pub fn is_suspended(&self, today: NaiveDate) -> bool {
        self.suspended_until.is_some_and(|until| until < today)
    }
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            port: 0,
            jar: "vanilla.jar".to_string(),
            memory_mb: 1024,
            level_name: "world".to_string(),
            level_seed: String::new(),
            level_type: "DEFAULT".to_string(),
            motd: "A Minecraft Server".to_string(),
            max_players: 20,
            gamemode: 0,
            difficulty: 1,
            online_mode: true,
            pvp: true,
            whitelist: false,
            view_distance: 10,
            suspended_until: None,
        }
    }
}
