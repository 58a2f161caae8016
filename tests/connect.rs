// tests/connect.rs
//
// Discovery, connect and heartbeat against stub devices behind a fake port
// enumerator.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use paddle_lib::device::{StubLink, StubPaddle};
use paddle_lib::heartbeat::{Heartbeat, HeartbeatEvent, HeartbeatOptions};
use paddle_lib::io::{
    discover_once, ConnectionStatus, DiscoveryOptions, IoError, PortOpener, Result, Transport,
};
use paddle_lib::model::{Channel, ChannelConfigs, ParameterValue};
use paddle_lib::{connect, SessionOptions};

/// A port with nothing attached.
struct DeadPort;

impl Transport for DeadPort {
    fn name(&self) -> &str {
        "dead"
    }

    fn write_all(&mut self, _bytes: &[u8]) -> std::io::Result<()> {
        Ok(())
    }

    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::TimedOut.into())
    }

    fn clear(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// `/dev/ttyS0` is silent, `/dev/ttyACM0` has a paddle behind it.
struct Bench {
    paddle: Arc<Mutex<StubPaddle>>,
    unplugged: Mutex<Option<Arc<AtomicBool>>>,
}

impl Bench {
    fn new() -> Self {
        Self {
            paddle: Arc::new(Mutex::new(StubPaddle::new())),
            unplugged: Mutex::new(None),
        }
    }
}

impl PortOpener for Bench {
    fn candidates(&self) -> Result<Vec<String>> {
        Ok(vec!["/dev/ttyS0".to_string(), "/dev/ttyACM0".to_string()])
    }

    fn open(&self, port: &str, _timeout: Duration) -> Result<Box<dyn Transport>> {
        match port {
            "/dev/ttyACM0" => {
                let link = StubLink::with_device(port, Arc::clone(&self.paddle));
                *self.unplugged.lock().unwrap() = Some(link.unplug_handle());
                Ok(Box::new(link))
            }
            "/dev/ttyS0" => Ok(Box::new(DeadPort)),
            other => Err(IoError::connection(other, "no such port")),
        }
    }
}

/// One port whose first session link is pulled before it can load the
/// configuration. Opens alternate probe, session, probe, session.
struct FlakyCable {
    paddle: Arc<Mutex<StubPaddle>>,
    opens: AtomicUsize,
}

impl PortOpener for FlakyCable {
    fn candidates(&self) -> Result<Vec<String>> {
        Ok(vec!["/dev/ttyACM0".to_string()])
    }

    fn open(&self, port: &str, _timeout: Duration) -> Result<Box<dyn Transport>> {
        let link = StubLink::with_device(port, Arc::clone(&self.paddle));
        if self.opens.fetch_add(1, Ordering::SeqCst) == 1 {
            link.unplug_handle().store(true, Ordering::SeqCst);
        }
        Ok(Box::new(link))
    }
}

fn options() -> DiscoveryOptions {
    DiscoveryOptions {
        backoff: Duration::from_millis(1),
        max_passes: Some(3),
        ..Default::default()
    }
}

#[test]
fn test_discover_finds_paddle() {
    let bench = Bench::new();
    assert_eq!(
        discover_once(&bench, &options()).unwrap().as_deref(),
        Some("/dev/ttyACM0")
    );
}

#[test]
fn test_connect_loads_configuration() {
    let bench = Bench::new();
    bench.paddle.lock().unwrap().handle_line("color=RED");

    let mut statuses = Vec::new();
    let session = connect(&bench, &options(), &SessionOptions::default(), &mut |s| {
        statuses.push(s.clone())
    })
    .unwrap();

    assert_eq!(session.port(), "/dev/ttyACM0");
    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.current, Channel::Red);
    assert_eq!(snapshot.channels, ChannelConfigs::default());
    assert_eq!(statuses, vec![ConnectionStatus::Connected("/dev/ttyACM0".to_string())]);
}

#[test]
fn test_link_lost_during_startup_rediscovers() {
    let cable = FlakyCable {
        paddle: Arc::new(Mutex::new(StubPaddle::new())),
        opens: AtomicUsize::new(0),
    };

    let mut statuses = Vec::new();
    let session = connect(&cable, &options(), &SessionOptions::default(), &mut |s| {
        statuses.push(s.clone())
    })
    .unwrap();

    let port = "/dev/ttyACM0".to_string();
    assert_eq!(
        statuses,
        vec![
            ConnectionStatus::Connected(port.clone()),
            ConnectionStatus::Lost,
            ConnectionStatus::Connected(port),
        ]
    );
    assert_eq!(cable.opens.load(Ordering::SeqCst), 4);
    assert_eq!(session.snapshot().unwrap().channels, ChannelConfigs::default());
}

#[test]
fn test_override_to_missing_port_keeps_waiting() {
    let bench = Bench::new();
    let options = DiscoveryOptions {
        port_override: Some("/dev/ttyUSB9".to_string()),
        ..options()
    };
    let mut waits = 0;
    let err = connect(&bench, &options, &SessionOptions::default(), &mut |s| {
        if matches!(s, ConnectionStatus::Waiting { .. }) {
            waits += 1;
        }
    })
    .err()
    .unwrap();
    assert!(matches!(err, IoError::Connection { .. }), "{:?}", err);
    assert_eq!(waits, 3);
}

#[test]
fn test_heartbeat_with_foreground_commands() {
    let bench = Bench::new();
    let mut session = connect(&bench, &options(), &SessionOptions::default(), &mut |_| {}).unwrap();

    let (tx, rx) = mpsc::channel();
    let heartbeat = Heartbeat::spawn(
        session.transport(),
        HeartbeatOptions {
            interval: Duration::from_millis(2),
            retry_interval: Duration::from_millis(1),
            allowed_errors: 5,
            response_deadline: Duration::from_millis(500),
        },
        tx,
    );
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        HeartbeatEvent::Connected { beats: 1 }
    );

    // Commands interleave with pings without corrupting either.
    for cc in 0..20u8 {
        session
            .set_parameter(Channel::Blue, ParameterValue::Control(cc))
            .unwrap();
        assert_eq!(session.fetch_all_config().unwrap().get(Channel::Blue).control, cc);
    }
    assert!(heartbeat.is_connected());

    // Pulling the cable ends the heartbeat at once.
    let unplug = bench.unplugged.lock().unwrap().clone().unwrap();
    unplug.store(true, Ordering::SeqCst);
    let event = rx
        .iter()
        .find(|e| matches!(e, HeartbeatEvent::Disconnected { .. }))
        .unwrap();
    assert!(matches!(event, HeartbeatEvent::Disconnected { .. }));
    assert!(!heartbeat.is_connected());
    heartbeat.stop();
}
