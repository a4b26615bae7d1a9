use std::{path::PathBuf, sync::Arc, time::SystemTime};

use crate::{
    executor,
    launch::Launch,
    logbuf::LOG_FLUSH_BATCH,
    registry::Registry,
    store::FleetStore,
    ticker::TickHandler,
};

/// Shutdown makes this many passes over the fleet before giving up on
/// whatever is still running.
const DRAIN_ROUNDS: u32 = 10;

/// Minimum wall time per shutdown pass, so children get a real chance to
/// react to the stop before the next escalation check.
const DRAIN_ROUND_FLOOR: std::time::Duration = std::time::Duration::from_secs(2);

/// The per-tick driver: verifies the store, drains the command queue, pumps
/// and flushes instance output, reaps exited children and finalizes removals.
pub struct FleetSupervisor<S, L> {
    store: Arc<S>,
    launcher: L,
    registry: Registry,
    data_root: PathBuf,
}

impl<S: FleetStore, L: Launch> FleetSupervisor<S, L> {
    pub fn new(store: Arc<S>, launcher: L, data_root: PathBuf) -> Self {
        Self {
            store,
            launcher,
            registry: Registry::default(),
            data_root,
        }
    }

    async fn run_tick(&mut self) {
        let durable = self.store.verify_connection().await;
        if durable {
            executor::drain_queue(
                self.store.as_ref(),
                &mut self.registry,
                &self.launcher,
                &self.data_root,
                SystemTime::now(),
            )
            .await;
        } else {
            tracing::warn!("database unreachable; tick degraded to local supervision");
        }

        self.supervise_active(durable, false).await;
        self.cleanup_pending(durable, false).await;
    }

    /// Pumps console output, flushes log batches and retires instances whose
    /// process has exited with nothing left to flush. With `stop_all` every
    /// live instance also gets a stop request (escalating on later passes).
    async fn supervise_active(&mut self, durable: bool, stop_all: bool) {
        for port in self.registry.active_ports() {
            let Some(instance) = self.registry.get_active_mut(port) else {
                continue;
            };

            instance.pump_output();

            if durable && !instance.log.is_empty() {
                let batch = instance.log.peek_batch(LOG_FLUSH_BATCH);
                match self.store.flush_log(port, &batch).await {
                    Ok(written) => {
                        instance.log.pop_front(written);
                    }
                    Err(err) => {
                        // Lines stay buffered; the next tick retries.
                        tracing::warn!(port, error = %err, "log flush failed");
                    }
                }
            }

            if stop_all && instance.is_alive() {
                instance.send_stop(SystemTime::now()).await;
            }

            if instance.ready_to_retire() {
                tracing::info!(port, "instance exited; awaiting removal");
                self.registry.retire(port);
            }
        }
    }

    /// Finalizes every retired instance: close its pipes and mark it offline.
    /// During shutdown the resume flag is left set so the next run brings the
    /// port back up.
    async fn cleanup_pending(&mut self, durable: bool, resume_on_restart: bool) {
        for (port, mut instance) in self.registry.drain_pending() {
            instance.close_io();
            if durable {
                if let Err(err) = self
                    .store
                    .set_status(port, false, resume_on_restart)
                    .await
                {
                    tracing::warn!(port, error = %err, "could not mark instance offline");
                }
            }
            tracing::info!(port, "instance removed");
        }
    }

    /// Brings back every port flagged to resume, skipping suspended ones.
    async fn resume_instances(&mut self) {
        let ports = match self.store.resume_ports().await {
            Ok(ports) => ports,
            Err(err) => {
                tracing::error!(error = %err, "could not read resume flags");
                return;
            }
        };

        let today = chrono::Utc::now().date_naive();
        for port in ports {
            let suspended = match self.store.fetch_settings(port).await {
                Ok(Some(settings)) => settings.is_suspended(today),
                Ok(None) => {
                    tracing::warn!(port, "resume flag set but no settings row");
                    continue;
                }
                Err(err) => {
                    tracing::error!(port, error = %err, "could not read settings for resume");
                    continue;
                }
            };
            if suspended {
                tracing::info!(port, "instance suspended; not resuming");
                continue;
            }

            match self.launcher.launch(self.store.as_ref(), &self.data_root, port).await {
                Ok(instance) => {
                    self.registry.insert(instance);
                    tracing::info!(port, "instance resumed");
                }
                Err(err) => {
                    tracing::error!(port, error = format!("{err:#}"), "resume failed");
                }
            }
        }
    }

    /// Bounded shutdown: repeatedly stop everything still running and sweep
    /// up removals, then report whatever refused to die.
    async fn drain(&mut self) -> Vec<u16> {
        for round in 1..=DRAIN_ROUNDS {
            if self.registry.is_empty() {
                break;
            }
            tracing::info!(round, remaining = self.registry.active_len(), "draining fleet");

            let started = tokio::time::Instant::now();
            let durable = self.store.verify_connection().await;

            self.supervise_active(durable, true).await;
            self.cleanup_pending(durable, true).await;

            if self.registry.is_empty() {
                break;
            }
            let elapsed = started.elapsed();
            if elapsed < DRAIN_ROUND_FLOOR {
                tokio::time::sleep(DRAIN_ROUND_FLOOR - elapsed).await;
            }
        }

        self.registry.remaining_ports()
    }
}

impl<S: FleetStore, L: Launch> TickHandler for FleetSupervisor<S, L> {
    async fn before(&mut self) {
        if !self.store.verify_connection().await {
            tracing::warn!("database unreachable at startup; starting degraded");
            return;
        }
        if let Err(err) = self.store.clear_commands().await {
            tracing::error!(error = %err, "could not clear stale commands");
        }
        self.resume_instances().await;
    }

    async fn tick(&mut self) {
        self.run_tick().await;
    }

    async fn after(&mut self) {
        let failed = self.drain().await;
        for port in &failed {
            tracing::error!(port, "instance did not shut down");
        }
        if failed.is_empty() {
            tracing::info!("fleet drained");
        }
        self.store.close().await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::atomic::Ordering;

    use warden_types::InstanceSettings;

    use super::*;
    use crate::{launch::Launch, store::mem::MemStore, testutil};

    struct NoLauncher;
    impl Launch for NoLauncher {
        async fn launch<S: FleetStore>(
            &self,
            _store: &S,
            _data_root: &std::path::Path,
            _port: u16,
        ) -> anyhow::Result<crate::instance::Instance> {
            anyhow::bail!("not expected to launch")
        }
    }

    struct CatLauncher;
    impl Launch for CatLauncher {
        async fn launch<S: FleetStore>(
            &self,
            _store: &S,
            _data_root: &std::path::Path,
            port: u16,
        ) -> anyhow::Result<crate::instance::Instance> {
            Ok(testutil::cat_instance(port).await)
        }
    }

    fn supervisor<L: Launch>(
        store: Arc<MemStore>,
        launcher: L,
    ) -> FleetSupervisor<MemStore, L> {
        FleetSupervisor::new(store, launcher, PathBuf::from("servers"))
    }

    #[tokio::test]
    async fn degraded_tick_skips_the_queue_but_still_supervises() {
        let store = Arc::new(MemStore::new());
        store.reachable.store(false, Ordering::SeqCst);
        store.push_command(25565, "start", 0);

        let mut sup = supervisor(store.clone(), NoLauncher);
        let mut inst = testutil::cat_instance(25565).await;
        inst.process.kill_forced();
        testutil::wait_until_dead(&mut inst).await;
        sup.registry.insert(inst);

        sup.tick().await;

        // Queue untouched, but the dead child was still reaped.
        assert_eq!(store.fetch_count.load(Ordering::SeqCst), 0);
        assert!(store.command(25565, "start").is_some());
        assert!(!sup.registry.is_active(25565));
    }

    #[tokio::test]
    async fn dead_instance_is_reaped_flushed_and_marked_offline() {
        let store = Arc::new(MemStore::new());
        let mut sup = supervisor(store.clone(), NoLauncher);

        let mut inst = testutil::cat_instance(25565).await;
        assert!(inst.send_console("last words").await);
        testutil::wait_for_ready_output(&mut inst).await;
        inst.process.kill_forced();
        testutil::wait_until_dead(&mut inst).await;
        sup.registry.insert(inst);

        // First tick pumps and flushes the line and moves the instance into
        // pending removal; the same tick finalizes it.
        sup.tick().await;
        if sup.registry.is_active(25565) {
            sup.tick().await;
        }

        assert!(sup.registry.is_empty());
        assert_eq!(store.status_of(25565), Some((false, false)));
        let logs = store.logs.lock().unwrap();
        assert_eq!(logs.get(&25565).map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn failed_log_flush_keeps_lines_buffered() {
        let store = Arc::new(MemStore::new());
        store.fail_log_inserts.store(true, Ordering::SeqCst);
        let mut sup = supervisor(store.clone(), NoLauncher);

        let mut inst = testutil::cat_instance(25565).await;
        assert!(inst.send_console("hello").await);
        testutil::wait_for_ready_output(&mut inst).await;
        sup.registry.insert(inst);

        sup.tick().await;
        assert!(!sup.registry.get_active_mut(25565).unwrap().log.is_empty());

        // Once inserts work again, the retry drains the buffer.
        store.fail_log_inserts.store(false, Ordering::SeqCst);
        sup.tick().await;
        assert!(sup.registry.get_active_mut(25565).unwrap().log.is_empty());
        assert_eq!(
            store.logs.lock().unwrap().get(&25565).map(Vec::len),
            Some(1)
        );

        sup.registry
            .get_active_mut(25565)
            .unwrap()
            .process
            .kill_forced();
        sup.tick().await;
        sup.tick().await;
    }

    #[tokio::test]
    async fn startup_clears_commands_and_resumes_flagged_ports() {
        let store = Arc::new(MemStore::new());
        store.push_command(25565, "stale", 0);
        store.set_status(25565, false, true).await.unwrap();
        store.set_status(25566, false, false).await.unwrap();
        store
            .settings
            .lock()
            .unwrap()
            .insert(25565, InstanceSettings {
                port: 25565,
                ..InstanceSettings::default()
            });

        let mut sup = supervisor(store.clone(), CatLauncher);
        sup.before().await;

        assert!(store.commands.lock().unwrap().is_empty());
        assert!(sup.registry.is_active(25565));
        assert!(!sup.registry.is_active(25566));

        sup.registry
            .get_active_mut(25565)
            .unwrap()
            .process
            .kill_forced();
        let failed = sup.drain().await;
        assert!(failed.is_empty());
    }

    #[tokio::test]
    async fn suspended_port_is_not_resumed() {
        let today = chrono::Utc::now().date_naive();
        let store = Arc::new(MemStore::new());
        store.set_status(25565, false, true).await.unwrap();
        store.set_status(25566, false, true).await.unwrap();
        for (port, suspended_until) in [
            (25565, Some(today - chrono::Days::new(30))),
            (25566, Some(today + chrono::Days::new(30))),
        ] {
            store.settings.lock().unwrap().insert(port, InstanceSettings {
                port,
                suspended_until,
                ..InstanceSettings::default()
            });
        }

        let mut sup = supervisor(store.clone(), CatLauncher);
        sup.before().await;

        // A suspension date in the past blocks the resume; one still in the
        // future does not.
        assert!(!sup.registry.is_active(25565));
        assert!(sup.registry.is_active(25566));

        sup.registry
            .get_active_mut(25566)
            .unwrap()
            .process
            .kill_forced();
        sup.drain().await;
    }

    #[tokio::test]
    async fn drain_stops_cooperative_instances_and_sets_resume_flag() {
        let store = Arc::new(MemStore::new());
        let mut sup = supervisor(store.clone(), NoLauncher);
        sup.registry.insert(testutil::stoppable_instance(25565).await);

        let failed = sup.drain().await;

        assert!(failed.is_empty());
        assert!(sup.registry.is_empty());
        assert_eq!(store.status_of(25565), Some((false, true)));
    }
}
