use std::collections::BTreeMap;
use std::fmt;

use serde::Serializer;
use serde_derive::Serialize;

use crate::config::{GAP_THRESHOLD_SECS, MIN_SEGMENT_DURATION_SECS};
use crate::event::{format_hms, InattentionEvent};
use crate::frame::TrackId;

pub const UNKNOWN_REASON: &str = "unknown";

fn as_hms<S: Serializer>(secs: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_hms(*secs))
}

fn round_tenths<S: Serializer>(secs: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round1(*secs))
}

#[inline]
fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// A merged run of inattention events of one track.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimeSegment {
    #[serde(skip)]
    pub track_id: TrackId,
    #[serde(serialize_with = "as_hms")]
    pub start: f64,
    #[serde(serialize_with = "as_hms")]
    pub end: f64,
    #[serde(serialize_with = "round_tenths")]
    pub duration_sec: f64,
    pub reason: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub time_ranges: Vec<TimeSegment>,
    #[serde(serialize_with = "round_tenths")]
    pub total_duration_sec: f64,
    // kept segments, not raw events
    pub event_count: usize,
}

/// Per-track summaries; tracks without a kept segment are absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary(BTreeMap<TrackId, TrackSummary>);

impl serde::Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.0, serializer)
    }
}

impl Summary {
    #[inline]
    pub fn get(&self, track_id: TrackId) -> Option<&TrackSummary> {
        self.0.get(&track_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&TrackId, &TrackSummary)> {
        self.0.iter()
    }
}

/// Greedy gap merge over ascending times. Runs shorter than the minimum
/// duration are dropped.
pub fn merge_times(times: &[f64], gap: f64, min_duration: f64) -> Vec<(f64, f64)> {
    let mut ranges = Vec::new();
    let mut iter = times.iter().copied();

    let (mut start, mut end) = match iter.next() {
        Some(t) => (t, t),
        None => return ranges,
    };

    let mut close = |start: f64, end: f64| {
        if end - start >= min_duration {
            ranges.push((start, end));
        }
    };

    for t in iter {
        if t - end > gap {
            close(start, end);
            start = t;
        }

        end = t;
    }

    close(start, end);

    ranges
}

/// Most frequent reason token among events inside `[start, end]`; ties go to
/// the token seen first. Tokens are the rendered reasons of the event rows, so
/// a payload such as a duration makes a distinct token.
pub fn dominant_reason(events: &[&InattentionEvent], start: f64, end: f64) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();

    let in_range = events.iter().filter(|e| {
        let t = e.rounded_time();
        t >= start && t <= end
    });

    for event in in_range {
        for reason in &event.reasons {
            let token = reason.to_string();
            match counts.iter_mut().find(|(t, _)| *t == token) {
                Some((_, n)) => *n += 1,
                None => counts.push((token, 1)),
            }
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (token, n) in counts {
        if best.as_ref().map_or(true, |(_, m)| n > *m) {
            best = Some((token, n));
        }
    }

    best.map_or_else(|| UNKNOWN_REASON.to_string(), |(token, _)| token)
}

/// Segments of a single track. `events` must all belong to `track_id`.
pub fn track_segments(track_id: TrackId, events: &mut [&InattentionEvent]) -> Vec<TimeSegment> {
    events.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));

    // merged at row precision
    let times: Vec<f64> = events.iter().map(|e| e.rounded_time()).collect();

    merge_times(&times, GAP_THRESHOLD_SECS, MIN_SEGMENT_DURATION_SECS)
        .into_iter()
        .map(|(start, end)| TimeSegment {
            track_id,
            start,
            end,
            duration_sec: end - start,
            reason: dominant_reason(events, start, end),
        })
        .collect()
}

/// Batch pass over a frozen event list.
pub fn summarize(events: &[InattentionEvent]) -> Summary {
    let mut by_track: BTreeMap<TrackId, Vec<&InattentionEvent>> = BTreeMap::new();
    for event in events {
        by_track.entry(event.track_id).or_default().push(event);
    }

    let mut summary = BTreeMap::new();
    for (track_id, mut track_events) in by_track {
        let time_ranges = track_segments(track_id, &mut track_events);
        if time_ranges.is_empty() {
            continue;
        }

        summary.insert(
            track_id,
            TrackSummary {
                total_duration_sec: time_ranges.iter().map(|s| s.duration_sec).sum(),
                event_count: time_ranges.len(),
                time_ranges,
            },
        );
    }

    Summary(summary)
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);

        if self.is_empty() {
            writeln!(f, "=== Attention report ===")?;
            return writeln!(f, "No inattention detected.");
        }

        writeln!(f, "{}", rule)?;
        writeln!(f, "{:^70}", "Attention report")?;
        writeln!(f, "{}", rule)?;

        for (track_id, track) in self.iter() {
            writeln!(f)?;
            writeln!(f, "[student {:02}]", track_id)?;
            writeln!(f, "inattentive periods: {}", track.event_count)?;
            writeln!(f, "total inattentive time: {:.1}s", track.total_duration_sec)?;

            for (i, seg) in track.time_ranges.iter().enumerate() {
                writeln!(
                    f,
                    "  {}. {} ~ {} ({:.1}s)",
                    i + 1,
                    format_hms(seg.start),
                    format_hms(seg.end),
                    seg.duration_sec
                )?;
                writeln!(f, "     main reason: {}", seg.reason)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "students with inattention: {}", self.len())?;
        writeln!(f, "{}", rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::reason::Reason;

    fn event(track_id: TrackId, time_sec: f64, reasons: Vec<Reason>) -> InattentionEvent {
        InattentionEvent {
            track_id,
            frame: (time_sec * 10.0) as u64,
            time_sec,
            score: 20,
            reasons,
            bbox: BBox::default(),
        }
    }

    #[test]
    fn gap_splits_and_short_runs_drop() {
        let ranges = merge_times(&[1.0, 2.0, 3.0, 7.5, 8.0], 3.0, 1.0);
        assert_eq!(ranges, vec![(1.0, 3.0)]);
    }

    #[test]
    fn gap_equal_to_threshold_extends() {
        let ranges = merge_times(&[0.0, 3.0, 6.0], 3.0, 1.0);
        assert_eq!(ranges, vec![(0.0, 6.0)]);
    }

    #[test]
    fn single_event_is_noise() {
        assert!(merge_times(&[4.0], 3.0, 1.0).is_empty());
    }

    #[test]
    fn segment_scenario() {
        let events: Vec<_> = [1.0, 2.0, 3.0, 7.5, 8.0]
            .iter()
            .map(|&t| event(1, t, vec![Reason::BriefHeadDown]))
            .collect();

        let summary = summarize(&events);
        let track = summary.get(1).unwrap();

        assert_eq!(track.event_count, 1);
        assert_eq!(track.time_ranges[0].start, 1.0);
        assert_eq!(track.time_ranges[0].end, 3.0);
        assert_eq!(track.total_duration_sec, 2.0);
        assert_eq!(track.time_ranges[0].reason, "brief head-down");
    }

    #[test]
    fn dominant_reason_tie_goes_to_first_seen() {
        let a = Reason::HandAnomaly;
        let b = Reason::BriefHeadDown;
        let events = vec![
            event(1, 1.0, vec![a]),
            event(1, 1.5, vec![a, b]),
            event(1, 2.0, vec![b]),
        ];

        let summary = summarize(&events);
        assert_eq!(summary.get(1).unwrap().time_ranges[0].reason, "hand anomaly");
    }

    #[test]
    fn durations_make_distinct_reason_tokens() {
        let events = vec![
            event(1, 1.0, vec![Reason::HeadDown(3.0), Reason::HandAnomaly]),
            event(1, 1.5, vec![Reason::HeadDown(3.1), Reason::HandAnomaly]),
            event(1, 2.0, vec![Reason::HeadDown(3.2)]),
        ];

        let summary = summarize(&events);
        assert_eq!(summary.get(1).unwrap().time_ranges[0].reason, "hand anomaly");
    }

    #[test]
    fn equal_sustained_tokens_are_counted_together() {
        let events = vec![
            event(1, 1.0, vec![Reason::HandAnomaly]),
            event(1, 1.5, vec![Reason::Stillness(4.0)]),
            event(1, 2.0, vec![Reason::Stillness(4.0)]),
        ];

        let summary = summarize(&events);
        assert_eq!(summary.get(1).unwrap().time_ranges[0].reason, "zoning out (4.0s)");
    }

    #[test]
    fn gap_is_measured_on_rounded_times() {
        // 3.004s apart unrounded, exactly 3.0s at row precision
        let events = vec![
            event(2, 1.0, vec![Reason::HandAnomaly]),
            event(2, 4.004, vec![Reason::HandAnomaly]),
        ];

        let summary = summarize(&events);
        let track = summary.get(2).unwrap();

        assert_eq!(track.event_count, 1);
        assert_eq!(track.time_ranges[0].end, 4.0);
        assert_eq!(track.total_duration_sec, 3.0);
    }

    #[test]
    fn reasonless_segment_is_unknown() {
        let events = vec![event(4, 0.0, vec![]), event(4, 2.0, vec![])];
        let summary = summarize(&events);

        assert_eq!(summary.get(4).unwrap().time_ranges[0].reason, UNKNOWN_REASON);
    }

    #[test]
    fn empty_input_empty_summary() {
        let summary = summarize(&[]);
        assert!(summary.is_empty());
        assert!(summary.to_string().contains("No inattention detected"));
    }

    #[test]
    fn unsorted_events_and_track_omission() {
        let events = vec![
            event(2, 5.0, vec![Reason::HandAnomaly]),
            event(1, 9.0, vec![Reason::HandAnomaly]),
            event(2, 3.0, vec![Reason::HandAnomaly]),
            event(2, 4.0, vec![Reason::HandAnomaly]),
        ];

        let summary = summarize(&events);
        assert_eq!(summary.len(), 1);
        assert!(summary.get(1).is_none());

        let seg = &summary.get(2).unwrap().time_ranges[0];
        assert_eq!((seg.start, seg.end), (3.0, 5.0));
    }

    #[test]
    fn serializes_report_shape() {
        let events = vec![
            event(3, 61.0, vec![Reason::HandAnomaly]),
            event(3, 63.25, vec![Reason::HandAnomaly]),
        ];
        let json = serde_json::to_value(summarize(&events)).unwrap();

        let track = &json["3"];
        assert_eq!(track["event_count"], 1);
        assert_eq!(track["total_duration_sec"], 2.3);
        assert_eq!(track["time_ranges"][0]["start"], "0:01:01");
        assert_eq!(track["time_ranges"][0]["end"], "0:01:03");
        assert_eq!(track["time_ranges"][0]["reason"], "hand anomaly");
    }

    #[test]
    fn report_lists_ranges() {
        let events = vec![
            event(5, 1.0, vec![Reason::HandAnomaly]),
            event(5, 2.5, vec![Reason::HandAnomaly]),
        ];
        let text = summarize(&events).to_string();

        assert!(text.contains("[student 05]"));
        assert!(text.contains("0:00:01 ~ 0:00:02 (1.5s)"));
        assert!(text.contains("main reason: hand anomaly"));
        assert!(text.contains("students with inattention: 1"));
    }
}
