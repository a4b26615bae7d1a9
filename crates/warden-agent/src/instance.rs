use std::time::{Duration, SystemTime};

use crate::{logbuf::LogBuffer, process::ProcessHandle, pump::OutputPump};

/// Grace window between the console "stop" text and a forced kill.
pub const STOP_GRACE: Duration = Duration::from_secs(20);

/// At most this many console lines are pumped per instance per tick.
pub const PUMP_READ_BATCH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopState {
    NotRequested,
    /// The console "stop" text was sent at this time; waiting out the grace
    /// window before escalating.
    StopSent { at: SystemTime },
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    SendStopText,
    ForceKill,
    Wait,
}

/// Total escalation state machine for stopping one instance. Time is passed
/// in so the 20 s window is testable without a wall clock.
#[derive(Debug)]
pub struct StopEscalation {
    state: StopState,
}

impl StopEscalation {
    pub fn new() -> Self {
        Self {
            state: StopState::NotRequested,
        }
    }

    pub fn state(&self) -> StopState {
        self.state
    }

    /// Advances the machine for one stop request at `now` and returns what
    /// the caller must do.
    pub fn request(&mut self, now: SystemTime) -> StopAction {
        match self.state {
            StopState::NotRequested => {
                self.state = StopState::StopSent { at: now };
                StopAction::SendStopText
            }
            StopState::StopSent { at } => {
                let elapsed = now.duration_since(at).unwrap_or_default();
                if elapsed > STOP_GRACE {
                    self.state = StopState::Forced;
                    StopAction::ForceKill
                } else {
                    StopAction::Wait
                }
            }
            StopState::Forced => StopAction::Wait,
        }
    }
}

/// One supervised child server: its process, console pump, pending log
/// lines and stop bookkeeping.
#[derive(Debug)]
pub struct Instance {
    port: u16,
    pub(crate) process: ProcessHandle,
    pub(crate) pump: OutputPump,
    pub(crate) log: LogBuffer,
    stop: StopEscalation,
}

impl Instance {
    pub fn new(port: u16, process: ProcessHandle, pump: OutputPump) -> Self {
        Self {
            port,
            process,
            pump,
            log: LogBuffer::default(),
            stop: StopEscalation::new(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_alive(&mut self) -> bool {
        self.process.is_alive()
    }

    pub fn stop_state(&self) -> StopState {
        self.stop.state()
    }

    /// First request sends the console "stop" text; past the grace window a
    /// later request forces the kill. Requests inside the window are no-ops.
    pub async fn send_stop(&mut self, now: SystemTime) {
        match self.stop.request(now) {
            StopAction::SendStopText => {
                if self.pump.send("stop").await {
                    tracing::info!(port = self.port, "instance asked to stop");
                } else {
                    tracing::warn!(port = self.port, "stop text could not be delivered");
                }
            }
            StopAction::ForceKill => {
                self.process.kill_forced();
                tracing::info!(port = self.port, "instance forced to stop");
            }
            StopAction::Wait => {}
        }
    }

    pub async fn send_console(&mut self, line: &str) -> bool {
        self.pump.send(line).await
    }

    /// Moves up to [`PUMP_READ_BATCH`] ready console lines into the log
    /// buffer. Never blocks.
    pub fn pump_output(&mut self) -> usize {
        let mut moved = 0;
        while moved < PUMP_READ_BATCH && self.pump.has_ready_output() {
            let Some(line) = self.pump.read_line() else {
                break;
            };
            self.log.push(line);
            moved += 1;
        }
        moved
    }

    /// An instance leaves active supervision once its process has exited and
    /// nothing remains to read or flush.
    pub fn ready_to_retire(&mut self) -> bool {
        !self.pump.has_ready_output() && self.log.is_empty() && !self.process.is_alive()
    }

    pub fn close_io(&mut self) {
        self.pump.close();
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn first_request_sends_stop_text_once() {
        let mut esc = StopEscalation::new();
        assert_eq!(esc.request(t0()), StopAction::SendStopText);
        assert_eq!(esc.state(), StopState::StopSent { at: t0() });
    }

    #[test]
    fn requests_inside_grace_window_wait() {
        let mut esc = StopEscalation::new();
        esc.request(t0());
        assert_eq!(esc.request(t0() + Duration::from_secs(5)), StopAction::Wait);
        assert_eq!(
            esc.request(t0() + Duration::from_secs(20)),
            StopAction::Wait
        );
    }

    #[test]
    fn escalates_to_exactly_one_forced_kill() {
        let mut esc = StopEscalation::new();
        esc.request(t0());
        assert_eq!(
            esc.request(t0() + Duration::from_secs(21)),
            StopAction::ForceKill
        );
        assert_eq!(esc.state(), StopState::Forced);
        // Further requests do nothing; the kill was already forced.
        assert_eq!(
            esc.request(t0() + Duration::from_secs(40)),
            StopAction::Wait
        );
    }

    #[test]
    fn clock_rollback_does_not_escalate() {
        let mut esc = StopEscalation::new();
        esc.request(t0());
        assert_eq!(esc.request(t0() - Duration::from_secs(60)), StopAction::Wait);
    }

    #[cfg(unix)]
    mod with_child {
        use super::*;
        use crate::testutil;

        #[tokio::test]
        async fn escalation_kills_unresponsive_child() {
            // cat echoes the "stop" text instead of exiting.
            let mut inst = testutil::cat_instance(25565).await;

            inst.send_stop(t0()).await;
            assert!(matches!(inst.stop_state(), StopState::StopSent { .. }));
            assert!(inst.is_alive());

            // Within the window: no-op.
            inst.send_stop(t0() + Duration::from_secs(10)).await;
            assert!(inst.is_alive());

            inst.send_stop(t0() + Duration::from_secs(21)).await;
            assert_eq!(inst.stop_state(), StopState::Forced);
            assert!(testutil::wait_until_dead(&mut inst).await);
        }

        #[tokio::test]
        async fn pump_output_is_batched() {
            let mut inst = testutil::cat_instance(25566).await;
            for i in 0..30 {
                assert!(inst.send_console(&format!("line {i}")).await);
            }
            testutil::wait_for_ready_output(&mut inst).await;
            // Give the echo loop a moment to push everything through.
            tokio::time::sleep(Duration::from_millis(300)).await;

            let moved = inst.pump_output();
            assert_eq!(moved, PUMP_READ_BATCH);
            assert_eq!(inst.log.len(), PUMP_READ_BATCH);

            let moved = inst.pump_output();
            assert_eq!(moved, 10);

            inst.process.kill_forced();
        }
    }
}
