use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

const DEFAULT_TICK_FLOOR_MS: u64 = 200;

/// Shared run state between the control loop and the console. `stopped`
/// starts true so EXIT is accepted before the first START.
#[derive(Debug)]
pub struct TickFlags {
    stopped: AtomicBool,
    stopping: AtomicBool,
}

impl Default for TickFlags {
    fn default() -> Self {
        Self {
            stopped: AtomicBool::new(true),
            stopping: AtomicBool::new(false),
        }
    }
}

impl TickFlags {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }
}

/// One run of the supervisor between START and the end of shutdown.
pub trait TickHandler {
    async fn before(&mut self) {}
    async fn tick(&mut self);
    async fn after(&mut self) {}
}

/// Fixed-floor control loop. A tick that finishes early sleeps out the rest
/// of the floor; a slow tick is never compensated for.
pub struct Ticker {
    flags: Arc<TickFlags>,
    floor: Duration,
}

impl Ticker {
    pub fn new(flags: Arc<TickFlags>, floor: Duration) -> Self {
        Self { flags, floor }
    }

    pub async fn run<H: TickHandler>(self, mut handler: H) {
        // `stopping` is not reset here: a stop requested between spawn and
        // the first tick must still be honored.
        self.flags.stopped.store(false, Ordering::SeqCst);
        tracing::info!(floor_ms = self.floor.as_millis() as u64, "control loop started");

        handler.before().await;

        while !self.flags.is_stopping() {
            let started = tokio::time::Instant::now();
            handler.tick().await;

            let elapsed = started.elapsed();
            if elapsed < self.floor {
                tokio::time::sleep(self.floor - elapsed).await;
            }
        }

        handler.after().await;

        self.flags.stopped.store(true, Ordering::SeqCst);
        self.flags.stopping.store(false, Ordering::SeqCst);
        tracing::info!("control loop stopped");
    }
}

/// Tick floor from `WARDEN_TICK_FLOOR_MS`, clamped to a sane range.
pub fn tick_floor() -> Duration {
    let ms = std::env::var("WARDEN_TICK_FLOOR_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TICK_FLOOR_MS)
        .clamp(50, 10_000);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        flags: Arc<TickFlags>,
        ticks: u32,
    }

    impl TickHandler for Counting {
        async fn tick(&mut self) {
            self.ticks += 1;
            if self.ticks == 3 {
                self.flags.request_stop();
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_until_stop_is_requested() {
        let flags = Arc::new(TickFlags::default());
        assert!(flags.is_stopped());

        let handler = Counting {
            flags: flags.clone(),
            ticks: 0,
        };
        let ticker = Ticker::new(flags.clone(), Duration::from_millis(200));
        ticker.run(handler).await;

        assert!(flags.is_stopped());
        assert!(!flags.is_stopping());
    }

    #[tokio::test(start_paused = true)]
    async fn hooks_run_once_per_run() {
        let flags = Arc::new(TickFlags::default());
        let mut probe = (0u32, 0u32, 0u32);

        struct Probe<'a> {
            flags: Arc<TickFlags>,
            out: &'a mut (u32, u32, u32),
        }
        impl TickHandler for Probe<'_> {
            async fn before(&mut self) {
                self.out.0 += 1;
            }
            async fn tick(&mut self) {
                self.out.1 += 1;
                self.flags.request_stop();
            }
            async fn after(&mut self) {
                self.out.2 += 1;
            }
        }

        Ticker::new(flags.clone(), Duration::from_millis(200))
            .run(Probe {
                flags,
                out: &mut probe,
            })
            .await;

        assert_eq!(probe, (1, 1, 1));
    }
}
