// src/heartbeat.rs
//
// Background connectivity check. Pings the paddle on a dedicated thread and
// reports transitions over a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::io::transport::{self, SharedTransport};
use crate::io::DEFAULT_RESPONSE_DEADLINE;
use crate::session;

#[derive(Clone, Debug)]
pub struct HeartbeatOptions {
    /// Pause between pings while healthy.
    pub interval: Duration,
    /// Pause between pings after a miss.
    pub retry_interval: Duration,
    /// Consecutive misses tolerated before giving up.
    pub allowed_errors: u32,
    pub response_deadline: Duration,
}

impl Default for HeartbeatOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            retry_interval: Duration::from_secs(1),
            allowed_errors: 5,
            response_deadline: DEFAULT_RESPONSE_DEADLINE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeartbeatEvent {
    /// First successful ping, or the first one after a miss.
    Connected { beats: u64 },
    Missed { consecutive: u32, allowed: u32 },
    /// The heartbeat has stopped; re-discovery is up to the owner.
    Disconnected { reason: String },
}

pub struct Heartbeat {
    running: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn spawn(
        transport: SharedTransport,
        options: HeartbeatOptions,
        events: Sender<HeartbeatEvent>,
    ) -> Heartbeat {
        let running = Arc::new(AtomicBool::new(true));
        let connected = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            transport,
            options,
            events,
            running: Arc::clone(&running),
            connected: Arc::clone(&connected),
        };
        let handle = std::thread::Builder::new()
            .name("paddle-heartbeat".to_string())
            .spawn(move || worker.run())
            .map_err(|e| warn!("failed to start heartbeat thread: {}", e))
            .ok();

        if handle.is_none() {
            running.store(false, Ordering::SeqCst);
        }

        Heartbeat {
            running,
            connected,
            handle,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Flag readable from other threads.
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    /// Stop the thread and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    transport: SharedTransport,
    options: HeartbeatOptions,
    events: Sender<HeartbeatEvent>,
    running: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) {
        let allowed = self.options.allowed_errors;
        let mut misses: u32 = 0;
        let mut beats: u64 = 0;
        let mut healthy = false;

        while self.running.load(Ordering::SeqCst) {
            match session::ping(&self.transport, self.options.response_deadline) {
                Ok(()) => {
                    beats += 1;
                    misses = 0;
                    self.connected.store(true, Ordering::SeqCst);
                    if !healthy {
                        healthy = true;
                        info!("heartbeat: connected");
                        self.emit(HeartbeatEvent::Connected { beats });
                    }
                }
                Err(e) if e.is_transport_lost() => {
                    self.disconnect(format!("{}", e));
                    return;
                }
                Err(e) => {
                    misses += 1;
                    healthy = false;
                    debug!("heartbeat: miss {}/{}: {}", misses, allowed, e);
                    self.emit(HeartbeatEvent::Missed {
                        consecutive: misses,
                        allowed,
                    });
                    if let Err(e) = self.flush() {
                        self.disconnect(format!("{}", e));
                        return;
                    }
                    if misses > allowed {
                        self.disconnect(format!("{} consecutive pings failed", misses));
                        return;
                    }
                }
            }

            let pause = if misses == 0 {
                self.options.interval
            } else {
                self.options.retry_interval
            };
            self.sleep(pause);
        }
    }

    fn flush(&self) -> crate::io::Result<()> {
        let mut guard = transport::lock(&self.transport)?;
        transport::clear(&mut **guard)
    }

    fn disconnect(&self, reason: String) {
        warn!("heartbeat: disconnected ({})", reason);
        self.connected.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.emit(HeartbeatEvent::Disconnected { reason });
    }

    fn emit(&self, event: HeartbeatEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Sleep in small steps so `stop` is honoured quickly.
    fn sleep(&self, total: Duration) {
        let until = Instant::now() + total;
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= until {
                break;
            }
            std::thread::sleep((until - now).min(Duration::from_millis(10)));
        }
    }
}
