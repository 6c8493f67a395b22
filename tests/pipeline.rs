use std::sync::atomic::AtomicBool;

use inattention::monitor::Worker;
use inattention::{AttentionMonitor, BBox, Config, Frame, Monitoring, Observation, Reason};

fn pose(nose_y: f32) -> Vec<[f32; 3]> {
    let mut rows = vec![[0.0, 0.0, 0.1]; 17];
    rows[0] = [100.0, nose_y, 0.9];
    rows[1] = [90.0, 45.0, 0.9];
    rows[2] = [110.0, 45.0, 0.9];
    rows[5] = [70.0, 100.0, 0.9];
    rows[6] = [130.0, 100.0, 0.9];
    rows[9] = [60.0, 150.0, 0.9];
    rows[10] = [140.0, 150.0, 0.9];
    rows[11] = [80.0, 200.0, 0.9];
    rows[12] = [120.0, 200.0, 0.9];
    rows
}

fn observation(track_id: i32, nose_y: f32) -> Observation {
    Observation {
        track_id,
        bbox: BBox::ltrb(10, 20, 110, 220),
        keypoints: pose(nose_y),
    }
}

fn config() -> Config {
    Config {
        skip_frames: 0,
        stillness_threshold: 0.0,
        ..Config::default()
    }
}

/// Track 1 looks down for the first `down` frames and then sits up; track 2
/// stays upright throughout.
fn classroom(frames: u64, down: u64) -> Vec<Frame> {
    (0..frames)
        .map(|i| {
            let nose_y = if i < down { 120.0 } else { 50.0 };
            Frame::new(i, vec![observation(1, nose_y), observation(2, 50.0)])
        })
        .collect()
}

#[test]
fn sustained_head_down_becomes_a_segment() {
    let mut monitor = AttentionMonitor::new(config(), 10.0).unwrap();
    let stop = AtomicBool::new(false);

    assert!(!monitor.run(classroom(100, 60), &stop, |_| {}));
    let report = monitor.into_report(false);

    // head-down timer crosses 3s at frame 29 and holds until frame 59
    assert_eq!(report.events.len(), 31);
    assert!(report.events.iter().all(|e| e.track_id == 1 && e.score == 20));
    assert!(matches!(report.events[0].reasons[..], [Reason::HeadDown(_)]));

    assert_eq!(report.summary.len(), 1);
    let track = report.summary.get(1).unwrap();
    assert_eq!(track.event_count, 1);
    // every event carries a different duration, so the first one wins the tie
    assert_eq!(track.time_ranges[0].reason, "sustained head-down (3.0s)");
    assert!((track.time_ranges[0].start - 2.9).abs() < 1e-9);
    assert!((track.time_ranges[0].end - 5.9).abs() < 1e-9);

    let rows = report.rows();
    assert_eq!(rows[0].time_str, "0:00:02");
    assert_eq!(rows[0].reason, "sustained head-down (3.0s)");
}

#[test]
fn upright_class_reports_nothing() {
    let mut monitor = AttentionMonitor::new(config(), 10.0).unwrap();
    for frame in classroom(50, 0) {
        monitor.update(&frame).unwrap();
    }

    assert!(monitor.events().is_empty());
    let summary = monitor.summary();
    assert!(summary.is_empty());
    assert!(summary.to_string().contains("No inattention detected."));
}

#[test]
fn empty_stream_has_empty_report() {
    let mut monitor = AttentionMonitor::new(config(), 25.0).unwrap();
    let stop = AtomicBool::new(false);

    let mut progress = Vec::new();
    monitor.run(Vec::<Frame>::new(), &stop, |p| progress.push(p));

    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0].processed, 0);

    let report = monitor.into_report(false);
    assert!(report.events.is_empty());
    assert!(report.summary.is_empty());
}

#[test]
fn out_of_order_frames_are_skipped_in_runs() {
    let mut monitor = AttentionMonitor::new(config(), 10.0).unwrap();
    let stop = AtomicBool::new(false);

    let frames = vec![
        Frame::new(5, vec![observation(1, 50.0)]),
        Frame::new(2, vec![observation(1, 50.0)]),
        Frame::new(6, vec![observation(1, 50.0)]),
    ];
    monitor.run(frames, &stop, |_| {});

    assert_eq!(monitor.processed_frames(), 2);
}

#[test]
fn malformed_observation_is_a_zero_score_event() {
    let mut monitor = AttentionMonitor::new(config(), 10.0).unwrap();
    let broken = Observation {
        track_id: 9,
        bbox: BBox::default(),
        keypoints: vec![[1.0, 2.0, 0.9]; 4],
    };

    monitor.update(&Frame::new(0, vec![broken])).unwrap();

    let events = monitor.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].score, 0);
    assert!(events[0].reasons.is_empty());
    assert!(monitor.tracker().is_empty());
}

#[test]
fn worker_runs_to_completion() {
    let monitor = AttentionMonitor::new(config(), 10.0).unwrap();
    let worker = Worker::spawn(monitor, classroom(100, 60));

    let updates: Vec<_> = worker.progress().iter().collect();
    let report = worker.join().unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.processed_frames, 100);
    assert_eq!(updates.last().map(|p| p.processed), Some(100));
    assert_eq!(report.summary.len(), 1);
}

#[test]
fn stopped_worker_still_reports() {
    let monitor = AttentionMonitor::new(config(), 10.0).unwrap();

    // endless stream; only the stop flag ends it
    let frames = (0..).map(|i| Frame::new(i, vec![observation(1, 120.0)]));
    let worker = Worker::spawn(monitor, frames);

    // wait for some progress so there is something to report
    let first = worker.progress().recv().unwrap();
    assert!(first.processed >= 50);
    worker.stop();

    let report = worker.join().unwrap();
    assert!(report.cancelled);
    assert!(report.processed_frames >= 50);
    assert!(!report.events.is_empty());
    assert_eq!(report.rows().len(), report.events.len());
}

#[test]
fn frame_stream_parses_from_json_lines() {
    let lines = [
        r#"{"index": 0, "observations": []}"#,
        r#"{"index": 3}"#,
    ];

    let frames: Vec<Frame> = lines
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let mut monitor = AttentionMonitor::new(Config::default(), 30.0).unwrap();
    for frame in &frames {
        monitor.update(frame).unwrap();
    }

    assert_eq!(monitor.processed_frames(), 2);
}
