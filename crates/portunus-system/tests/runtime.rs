//! Full system bring-up, policy flow and reporting.

use parking_lot::Mutex;
use portunus_core::{Error, Event, EventKind, FeedbackKind, SystemConfig, Uid};
use portunus_hardware::Delay;
use portunus_hardware::mock::{
    MockConnectivity, MockDoorSensor, MockIndicator, MockStrike, NoDelay,
};
use portunus_rfid::{Mfrc522, SimHandle, SimulatedMfrc522};
use portunus_system::modules::{
    CardReader, ConnectivityMonitor, DoorSensorMonitor, DoorStrike, Reporter, StatusLed,
};
use portunus_system::{
    MemorySink, Module, PolicyState, ReportRecord, Runtime, RuntimeState, SystemContext,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

struct Rig {
    runtime: Runtime,
    sim: SimHandle,
    strike: MockStrike,
    link: MockConnectivity,
    sink: MemorySink,
    seen: Arc<Mutex<Vec<Event>>>,
}

/// Records every event the consumer dispatches, in dispatch order.
struct Recorder {
    seen: Arc<Mutex<Vec<Event>>>,
}

impl Module for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn handle(&mut self, event: &Event, _ctx: &SystemContext) {
        self.seen.lock().push(*event);
    }
}

fn rig(config: SystemConfig) -> Rig {
    let (chip, sim) = SimulatedMfrc522::new();
    let strike = MockStrike::new();
    let link = MockConnectivity::new();
    let sink = MemorySink::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut runtime = Runtime::new(config);
    let modules: Vec<Box<dyn Module>> = vec![
        Box::new(Recorder {
            seen: Arc::clone(&seen),
        }),
        Box::new(DoorStrike::new(Arc::new(strike.clone()))),
        Box::new(StatusLed::new(Arc::new(MockIndicator::new()))),
        Box::new(DoorSensorMonitor::new(Arc::new(MockDoorSensor::new()))),
        Box::new(CardReader::new(Mfrc522::new(chip, NoDelay::new()))),
        Box::new(ConnectivityMonitor::new(Arc::new(link.clone()))),
        Box::new(Reporter::new(Arc::new(sink.clone()), Arc::new(link.clone()))),
    ];
    for module in modules {
        runtime.register(module).unwrap();
    }

    Rig {
        runtime,
        sim,
        strike,
        link,
        sink,
        seen,
    }
}

fn feedback_trail(events: &[Event]) -> Vec<FeedbackKind> {
    events.iter().filter_map(Event::feedback_kind).collect()
}

#[tokio::test(start_paused = true)]
async fn test_boot_connect_scan_unlock_flow() {
    let mut rig = rig(SystemConfig::default());
    rig.runtime.start().await.unwrap();
    let policy = rig.runtime.policy_state();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(*policy.borrow(), PolicyState::Connecting);

    rig.link.connect(-60);
    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(*policy.borrow(), PolicyState::Running);

    let uid: Uid = "04:A3:2B:11".parse().unwrap();
    rig.sim.present_card(uid);
    sleep(Duration::from_millis(200)).await;
    assert!(rig.strike.is_unlocked());

    sleep(Duration::from_millis(5_000)).await;
    assert!(!rig.strike.is_unlocked());

    let seen = rig.seen.lock().clone();
    assert_eq!(
        seen.iter().map(|e| e.kind).collect::<Vec<_>>(),
        vec![
            EventKind::Boot,
            EventKind::Feedback,
            EventKind::ConnectivityUp,
            EventKind::Feedback,
            EventKind::CardScanned,
            EventKind::AccessRequest,
            EventKind::Feedback,
            EventKind::UnlockRequested,
        ]
    );
    assert_eq!(
        feedback_trail(&seen),
        vec![
            FeedbackKind::Armed,
            FeedbackKind::Online,
            FeedbackKind::AccessGranted
        ]
    );
    assert_eq!(seen[5].uid, Some(uid));
    assert_eq!(seen[7].unlock_ms(), Some(3_000));

    rig.runtime.shutdown().await;
    assert_eq!(*rig.runtime.state(), RuntimeState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_card_while_offline_is_denied() {
    let mut rig = rig(SystemConfig::default());
    rig.runtime.start().await.unwrap();

    rig.sim.present_card("04:52:9C:1A:7F:33:80".parse().unwrap());
    sleep(Duration::from_millis(300)).await;

    let seen = rig.seen.lock().clone();
    assert_eq!(
        feedback_trail(&seen),
        vec![FeedbackKind::Armed, FeedbackKind::AccessDenied]
    );
    assert!(seen.iter().any(|e| e.kind == EventKind::AccessRequest));
    assert!(!seen.iter().any(|e| e.kind == EventKind::UnlockRequested));
    assert_eq!(rig.strike.levels(), vec![false]);

    rig.runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reporter_copies_events_and_sends_heartbeats_while_online() {
    let mut config = SystemConfig::default();
    config.reporting.module_id = "lobby".to_string();
    config.reporting.heartbeat_interval_ms = 10_000;
    let mut rig = rig(config);
    rig.runtime.start().await.unwrap();

    // Offline: the first heartbeat slot is skipped.
    sleep(Duration::from_millis(10_500)).await;
    assert!(rig.sink.heartbeats().is_empty());

    rig.link.connect(-47);
    rig.sim.present_card("04:A3:2B:11".parse().unwrap());
    sleep(Duration::from_millis(10_000)).await;

    let beats = rig.sink.heartbeats();
    assert_eq!(beats.len(), 1);
    assert_eq!(beats[0].seq, 1);
    assert_eq!(beats[0].module_id, "lobby");
    assert_eq!(beats[0].wifi_rssi, Some(-47));
    assert_eq!(beats[0].uptime_ms, 20_000);

    let kinds: Vec<EventKind> = rig.sink.events().iter().map(|r| r.kind).collect();
    assert!(kinds.contains(&EventKind::CardScanned));
    assert!(kinds.contains(&EventKind::AccessRequest));
    assert!(kinds.contains(&EventKind::Feedback));
    assert!(!kinds.contains(&EventKind::ConnectivityUp));

    let boot_ids: Vec<_> = rig
        .sink
        .records()
        .iter()
        .map(|r| match r {
            ReportRecord::Heartbeat(h) => h.boot_id,
            ReportRecord::Event(e) => e.boot_id,
        })
        .collect();
    assert!(boot_ids.windows(2).all(|w| w[0] == w[1]));

    rig.runtime.shutdown().await;
}

#[tokio::test]
async fn test_invalid_configuration_leaves_failed_state() {
    let mut config = SystemConfig::default();
    config.bus.queue_length = 0;
    let mut runtime = Runtime::new(config);

    let err = runtime.start().await.unwrap_err();
    assert!(err.is_fatal_at_startup());
    assert_eq!(*runtime.state(), RuntimeState::Failed(err));
    assert!(runtime.context().is_none());

    assert!(matches!(
        runtime.start().await,
        Err(Error::AlreadyInitialized(_))
    ));
}

#[tokio::test]
async fn test_missing_reader_degrades_instead_of_failing() {
    let (chip, sim) = SimulatedMfrc522::new();
    sim.set_version(0x00);
    let strike = MockStrike::new();

    let mut runtime = Runtime::new(SystemConfig::default());
    runtime
        .register(Box::new(CardReader::new(Mfrc522::new(chip, NoDelay::new()))))
        .unwrap();
    runtime
        .register(Box::new(DoorStrike::new(Arc::new(strike.clone()))))
        .unwrap();

    runtime.start().await.unwrap();
    assert_eq!(*runtime.state(), RuntimeState::Running);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_register_after_start_is_rejected() {
    let mut runtime = Runtime::new(SystemConfig::default());
    runtime.start().await.unwrap();

    let strike = Box::new(DoorStrike::new(Arc::new(MockStrike::new())));
    assert!(matches!(
        runtime.register(strike),
        Err(Error::AlreadyInitialized(_))
    ));
    runtime.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_link_up_before_start_still_reaches_running() {
    for _ in 0..20 {
        let mut rig = rig(SystemConfig::default());
        rig.link.connect(-55);
        rig.runtime.start().await.unwrap();

        let mut policy = rig.runtime.policy_state();
        let reached = tokio::time::timeout(
            Duration::from_secs(2),
            policy.wait_for(|state| *state == PolicyState::Running),
        )
        .await
        .is_ok_and(|changed| changed.is_ok());
        assert!(reached, "policy stuck in {}", *policy.borrow());

        let seen = rig.seen.lock().clone();
        assert_eq!(seen.first().map(|e| e.kind), Some(EventKind::Boot));
        rig.runtime.shutdown().await;
    }
}

/// Sleeps the calling thread like a real settle delay on the serial bus.
struct SleepingDelay;

impl Delay for SleepingDelay {
    fn delay_ms(&mut self, _ms: u32) {
        std::thread::sleep(Duration::from_millis(200));
    }
}

#[tokio::test]
async fn test_reader_bring_up_does_not_stall_other_tasks() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let ticker = tokio::spawn(async move {
        loop {
            sleep(Duration::from_millis(10)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let (chip, _sim) = SimulatedMfrc522::new();
    let mut runtime = Runtime::new(SystemConfig::default());
    runtime
        .register(Box::new(CardReader::new(Mfrc522::new(chip, SleepingDelay))))
        .unwrap();
    runtime.start().await.unwrap();

    // The soft-reset settle alone sleeps 200 ms off the async thread.
    assert!(ticks.load(Ordering::SeqCst) >= 5);

    ticker.abort();
    runtime.shutdown().await;
}
