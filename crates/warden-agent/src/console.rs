use std::{path::PathBuf, sync::Arc};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    launch::Coordinator,
    store::DbStore,
    supervisor::FleetSupervisor,
    ticker::{TickFlags, Ticker, tick_floor},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Exit,
    Help,
    Unknown(String),
}

impl ConsoleCommand {
    /// Blank input is ignored; anything else either matches a keyword
    /// (case-insensitive) or is reported back as unknown.
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.trim();
        if word.is_empty() {
            return None;
        }
        Some(match word.to_ascii_uppercase().as_str() {
            "START" => Self::Start,
            "STOP" => Self::Stop,
            "EXIT" => Self::Exit,
            "HELP" => Self::Help,
            _ => Self::Unknown(word.to_string()),
        })
    }
}

/// Operator console on stdin. START spawns a supervisor run, STOP asks the
/// running one to drain, EXIT leaves once everything is stopped.
pub struct Console {
    flags: Arc<TickFlags>,
    store: Arc<DbStore>,
    data_root: PathBuf,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Console {
    pub fn new(store: Arc<DbStore>, data_root: PathBuf) -> Self {
        Self {
            flags: Arc::new(TickFlags::default()),
            store,
            data_root,
            task: None,
        }
    }

    /// The flags lag a freshly spawned run for an instant, so the join handle
    /// is checked as well.
    fn loop_is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
            || !self.flags.is_stopped()
            || self.flags.is_stopping()
    }

    pub async fn run(mut self) {
        tracing::info!("console ready; type HELP for commands");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Some(command) = ConsoleCommand::parse(&line) else {
                continue;
            };
            match command {
                ConsoleCommand::Start => self.start(),
                ConsoleCommand::Stop => self.stop(),
                ConsoleCommand::Exit => {
                    if self.loop_is_running() {
                        tracing::warn!("fleet is still running; STOP it before EXIT");
                        continue;
                    }
                    break;
                }
                ConsoleCommand::Help => {
                    tracing::info!("commands: START, STOP, EXIT, HELP");
                }
                ConsoleCommand::Unknown(word) => {
                    tracing::warn!(input = %word, "unknown console command");
                }
            }
        }

        // stdin may close with the loop still up; drain before leaving.
        if self.loop_is_running() {
            self.flags.request_stop();
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        tracing::info!("console closed");
    }

    fn start(&mut self) {
        if self.loop_is_running() {
            tracing::warn!("fleet is already running");
            return;
        }

        let supervisor: FleetSupervisor<DbStore, Coordinator> = FleetSupervisor::new(
            self.store.clone(),
            Coordinator,
            self.data_root.clone(),
        );
        let ticker = Ticker::new(self.flags.clone(), tick_floor());
        self.task = Some(tokio::spawn(ticker.run(supervisor)));
    }

    fn stop(&self) {
        if !self.loop_is_running() {
            tracing::warn!("fleet is already stopped");
            return;
        }
        if self.flags.is_stopping() {
            tracing::warn!("fleet is already stopping");
            return;
        }
        self.flags.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_parse_case_insensitively() {
        assert_eq!(ConsoleCommand::parse("start"), Some(ConsoleCommand::Start));
        assert_eq!(ConsoleCommand::parse(" STOP "), Some(ConsoleCommand::Stop));
        assert_eq!(ConsoleCommand::parse("Exit"), Some(ConsoleCommand::Exit));
        assert_eq!(ConsoleCommand::parse("help"), Some(ConsoleCommand::Help));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(ConsoleCommand::parse(""), None);
        assert_eq!(ConsoleCommand::parse("   "), None);
    }

    #[test]
    fn anything_else_is_unknown() {
        assert_eq!(
            ConsoleCommand::parse("restart"),
            Some(ConsoleCommand::Unknown("restart".to_string()))
        );
    }
}
