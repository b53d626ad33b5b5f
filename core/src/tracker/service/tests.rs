use super::*;
use crate::tracker::Diagnostics;
use std::io::Write;
use std::path::Path;

const WAIT: Duration = Duration::from_secs(5);

fn damage_line(time: f64, source: &str, target: &str, amount: i64) -> String {
    format!("0|CombatMsg_Damage|a|b|c|d|e|Spear|{time}|{source}|f|{target}|{amount}|0\n")
}

fn append(path: &Path, content: &str) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

struct Harness {
    cmd_tx: mpsc::Sender<TrackerCommand>,
    notify_rx: mpsc::UnboundedReceiver<Notification>,
    task: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn start(dir: &Path, identity: Option<&str>) -> Self {
        let mut config = AppConfig::with_log_directory(dir.to_string_lossy().into_owned());
        config.tracked_identity = identity.map(String::from);
        config.hidden_combat_grace_ms = 0;

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (_flags_tx, flags_rx) = watch::channel(TrackingFlags::default());
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let outputs = TrackerOutputs {
            notifications: notify_tx,
            sink: None,
            auto_reset: None,
        };
        let service = TrackerService::new(&config, flags_rx, cmd_rx, outputs);

        Self {
            cmd_tx,
            notify_rx,
            task: tokio::spawn(service.run()),
        }
    }

    /// Next notification matching `pred`, skipping everything before it.
    async fn expect(&mut self, pred: impl Fn(&Notification) -> bool) -> Notification {
        tokio::time::timeout(WAIT, async {
            loop {
                let notification = self.notify_rx.recv().await.unwrap();
                if pred(&notification) {
                    return notification;
                }
            }
        })
        .await
        .unwrap()
    }

    async fn stop(self) {
        self.cmd_tx.send(TrackerCommand::Stop).await.unwrap();
        self.task.await.unwrap();
    }
}

fn is_data_append(n: &Notification) -> bool {
    matches!(n, Notification::Row(RowEvent::Append(row)) if row.is_data())
}

#[tokio::test]
async fn test_existing_lines_are_aggregated() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("CombatLog_1.log");
    append(&log, &damage_line(1.0, "Odin", "Thor", 100));
    append(&log, &damage_line(3.0, "Odin", "Thor", 50));

    let mut harness = Harness::start(dir.path(), Some("Odin"));

    let changed = harness
        .expect(|n| matches!(n, Notification::LogFileChanged(_)))
        .await;
    assert_eq!(
        changed,
        Notification::LogFileChanged(Some("CombatLog_1.log".to_string()))
    );

    harness.expect(is_data_append).await;
    let Notification::Row(RowEvent::Append(row)) = harness.expect(is_data_append).await else {
        unreachable!();
    };
    assert_eq!(row.totals.damage, 150);
    assert_eq!(row.time, 2.0);

    harness.stop().await;
}

#[tokio::test]
async fn test_identity_detected_from_live_line() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("CombatLog_1.log");
    append(&log, &damage_line(1.0, "Ymir", "Thor", 10));

    let mut harness = Harness::start(dir.path(), None);
    harness
        .expect(|n| matches!(n, Notification::StateChanged(TrackerState::Tracking)))
        .await;

    // Give the tailer a chance to report that it has caught up.
    tokio::time::sleep(Duration::from_millis(300)).await;
    append(&log, &damage_line(2.0, "Odin", "Thor", 100));

    let detected = harness
        .expect(|n| matches!(n, Notification::IdentityDetected(_)))
        .await;
    assert_eq!(detected, Notification::IdentityDetected("Odin".to_string()));

    let Notification::Row(RowEvent::Append(row)) = harness.expect(is_data_append).await else {
        unreachable!();
    };
    assert_eq!(row.totals.damage, 100);

    harness.stop().await;
}

#[tokio::test]
async fn test_reset_command_appends_marker() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("CombatLog_1.log");
    append(&log, &damage_line(1.0, "Odin", "Thor", 100));

    let mut harness = Harness::start(dir.path(), Some("Odin"));
    harness.expect(is_data_append).await;
    // Hidden combat settles on the first empty read.
    harness
        .expect(|n| matches!(n, Notification::Row(RowEvent::ReplaceLast(row)) if !row.hidden_combat))
        .await;

    harness
        .cmd_tx
        .send(TrackerCommand::ResetTracking)
        .await
        .unwrap();
    let Notification::Row(RowEvent::Append(row)) = harness
        .expect(|n| matches!(n, Notification::Row(RowEvent::Append(_))))
        .await
    else {
        unreachable!();
    };
    assert_eq!(row.kind, RowKind::Reset);

    harness.stop().await;
}

#[tokio::test]
async fn test_end_sentinel_exhausts_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("CombatLog_1.log");
    append(&log, &damage_line(1.0, "Odin", "Thor", 100));

    let mut harness = Harness::start(dir.path(), Some("Odin"));
    harness.expect(is_data_append).await;

    append(&log, "end\n");
    harness
        .expect(|n| matches!(n, Notification::StateChanged(TrackerState::Exhausted)))
        .await;
    harness
        .expect(|n| matches!(n, Notification::LogFileChanged(None)))
        .await;

    harness.stop().await;
}

#[tokio::test]
async fn test_diagnostics_count_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("CombatLog_1.log");
    append(&log, "garbage\n");
    append(&log, "0|Unknown_Thing|a\n");

    let mut harness = Harness::start(dir.path(), Some("Odin"));
    harness
        .expect(|n| matches!(n, Notification::StateChanged(TrackerState::Tracking)))
        .await;

    harness
        .cmd_tx
        .send(TrackerCommand::RequestDiagnostics)
        .await
        .unwrap();
    let diagnostics = harness
        .expect(|n| matches!(n, Notification::Diagnostics(_)))
        .await;
    assert_eq!(
        diagnostics,
        Notification::Diagnostics(Diagnostics {
            malformed_lines: 1,
            unrecognized_events: 1,
            stale_corrections: 0,
        })
    );

    harness.stop().await;
}

#[tokio::test]
async fn test_stops_when_no_log_directory() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::start(&dir.path().join("missing"), None);
    harness.stop().await;
}

#[test]
fn test_outputs_forward_rows_to_sink_and_timer() {
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let (sink_tx, mut sink_rx) = mpsc::unbounded_channel();
    let (auto_tx, mut auto_rx) = mpsc::unbounded_channel();
    let outputs = TrackerOutputs {
        notifications: notify_tx,
        sink: Some(sink_tx),
        auto_reset: Some(auto_tx),
    };

    let mut engine = AggregationEngine::new(Some("Odin".to_string()), Duration::ZERO);
    engine.attach();
    let event = crate::combat_log::LogParser::new()
        .parse_line(1, damage_line(1.0, "Odin", "Thor", 5).trim_end())
        .unwrap();
    outputs.emit(engine.process_event(&event, &TrackingFlags::default(), 0.0));
    outputs.emit(engine.settle(0.0));
    outputs.emit(engine.reset_tracking(1.0));

    assert!(matches!(sink_rx.try_recv(), Ok(SinkTask::Row(RowEvent::Append(_)))));
    assert_eq!(auto_rx.try_recv().ok(), Some(AutoResetSignal::Activity));
    assert_eq!(auto_rx.try_recv().ok(), Some(AutoResetSignal::ResetObserved));
    assert!(auto_rx.try_recv().is_err());
    assert!(notify_rx.try_recv().is_ok());
}

#[test]
fn test_end_row_disarms_timer() {
    let (notify_tx, _notify_rx) = mpsc::unbounded_channel();
    let (auto_tx, mut auto_rx) = mpsc::unbounded_channel();
    let outputs = TrackerOutputs {
        notifications: notify_tx,
        sink: None,
        auto_reset: Some(auto_tx),
    };

    let mut engine = AggregationEngine::new(Some("Odin".to_string()), Duration::ZERO);
    engine.attach();
    let event = crate::combat_log::LogParser::new()
        .parse_line(1, damage_line(1.0, "Odin", "Thor", 5).trim_end())
        .unwrap();
    outputs.emit(engine.process_event(&event, &TrackingFlags::default(), 0.0));
    outputs.emit(engine.end_of_log());

    assert_eq!(auto_rx.try_recv().ok(), Some(AutoResetSignal::Activity));
    assert_eq!(auto_rx.try_recv().ok(), Some(AutoResetSignal::ResetObserved));
    assert!(auto_rx.try_recv().is_err());
}
