use std::sync::{mpsc, Arc};
use std::time::Duration;

use timelapse_engine::{spawn_ticker, ChannelEventSink, EngineEvent, TickerSettings};

fn fast_settings() -> TickerSettings {
    TickerSettings {
        interval: Duration::from_millis(10),
        max_increment: 10.0,
    }
}

#[test]
fn ticker_emits_until_guard_dropped() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (tx, rx) = mpsc::channel();
    let guard = spawn_ticker(
        runtime.handle(),
        3,
        fast_settings(),
        Arc::new(ChannelEventSink::new(tx)),
    );
    assert_eq!(guard.submission(), 3);

    for _ in 0..3 {
        match rx.recv_timeout(Duration::from_secs(2)).expect("tick") {
            EngineEvent::ProgressTick {
                submission,
                increment,
            } => {
                assert_eq!(submission, 3);
                assert!((0.0..10.0).contains(&increment));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    drop(guard);
    // Let the task observe cancellation, then drain anything already queued.
    std::thread::sleep(Duration::from_millis(50));
    while rx.try_recv().is_ok() {}
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn first_tick_waits_one_interval() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (tx, rx) = mpsc::channel();
    let settings = TickerSettings {
        interval: Duration::from_millis(300),
        max_increment: 10.0,
    };
    let _guard = spawn_ticker(runtime.handle(), 1, settings, Arc::new(ChannelEventSink::new(tx)));

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
}
