// Aggregate statistics over a completed set, for the feedback collaborator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::workout::{AnalysisRecord, CompletedWorkout, GOOD_FORM};

/// Number of reps reported by `worst_reps`
const WORST_REP_LIMIT: usize = 3;

/// Frames and time spent on one repetition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepSpan {
    pub rep: u32, // 1-based; frames before the first rep closes belong to rep 1
    pub start_frame: u64,
    pub end_frame: u64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub warmup_start_frame: u64,
    pub total_repetitions: u32,
    pub rep_spans: Vec<RepSpan>,
    pub average_rep_duration_ms: f64,
    pub form_issue_counts: BTreeMap<String, u32>,
    pub worst_reps: Vec<(u32, u32)>, // (rep, frames with issues)
    pub angle_stats: BTreeMap<String, AngleStats>,
    pub duration_ms: i64,
}

impl SessionMetrics {
    /// Summarize a set, ignoring setup frames before the first good-form
    /// frame less `warmup_backtrack_frames`
    pub fn calculate(workout: &CompletedWorkout, warmup_backtrack_frames: u64) -> Self {
        let warmup_start_frame = workout
            .analysis
            .iter()
            .find(|r| r.form_issues == GOOD_FORM)
            .map(|r| r.frame.saturating_sub(warmup_backtrack_frames))
            .unwrap_or(0);

        let records: Vec<&AnalysisRecord> = workout
            .analysis
            .iter()
            .filter(|r| r.frame >= warmup_start_frame)
            .collect();

        let total_repetitions = records.iter().map(|r| r.rep_count).max().unwrap_or(0);

        let rep_spans = rep_spans(&records, workout.metadata.rep_goal);
        let average_rep_duration_ms = if rep_spans.is_empty() {
            0.0
        } else {
            rep_spans.iter().map(|s| s.duration_ms as f64).sum::<f64>() / rep_spans.len() as f64
        };

        let mut form_issue_counts: BTreeMap<String, u32> = BTreeMap::new();
        let mut issues_per_rep: BTreeMap<u32, u32> = BTreeMap::new();
        for record in records.iter().filter(|r| r.form_issues != GOOD_FORM) {
            *form_issue_counts.entry(record.form_issues.clone()).or_default() += 1;
            *issues_per_rep.entry(record.rep_count + 1).or_default() += 1;
        }

        let mut worst_reps: Vec<(u32, u32)> = issues_per_rep.into_iter().collect();
        worst_reps.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        worst_reps.truncate(WORST_REP_LIMIT);

        let duration_ms = match (workout.analysis.first(), workout.analysis.last()) {
            (Some(first), Some(last)) => (last.timestamp_ms - first.timestamp_ms).max(0),
            _ => 0,
        };

        Self {
            warmup_start_frame,
            total_repetitions,
            rep_spans,
            average_rep_duration_ms,
            form_issue_counts,
            worst_reps,
            angle_stats: angle_stats(&records),
            duration_ms,
        }
    }
}

fn rep_spans(records: &[&AnalysisRecord], rep_goal: u32) -> Vec<RepSpan> {
    let mut spans: BTreeMap<u32, (u64, u64, i64, i64)> = BTreeMap::new();
    for record in records {
        let rep = record.rep_count + 1;
        if rep > rep_goal {
            continue;
        }
        let span = spans.entry(rep).or_insert((
            record.frame,
            record.frame,
            record.timestamp_ms,
            record.timestamp_ms,
        ));
        span.0 = span.0.min(record.frame);
        span.1 = span.1.max(record.frame);
        span.2 = span.2.min(record.timestamp_ms);
        span.3 = span.3.max(record.timestamp_ms);
    }

    spans
        .into_iter()
        .map(|(rep, (start_frame, end_frame, first_ms, last_ms))| RepSpan {
            rep,
            start_frame,
            end_frame,
            duration_ms: last_ms - first_ms,
        })
        .collect()
}

fn angle_stats(records: &[&AnalysisRecord]) -> BTreeMap<String, AngleStats> {
    let mut acc: BTreeMap<String, (f32, f32, f64, u64)> = BTreeMap::new();
    for angle in records.iter().flat_map(|r| r.angles.iter()) {
        let entry = acc
            .entry(angle.name.clone())
            .or_insert((f32::INFINITY, f32::NEG_INFINITY, 0.0, 0));
        entry.0 = entry.0.min(angle.value);
        entry.1 = entry.1.max(angle.value);
        entry.2 += angle.value as f64;
        entry.3 += 1;
    }

    acc.into_iter()
        .map(|(name, (min, max, sum, count))| {
            let stats = AngleStats {
                min,
                max,
                mean: (sum / count as f64) as f32,
                count,
            };
            (name, stats)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workout::{DisplayAngle, ExerciseKind, Strictness, WorkoutMetadata};

    fn record(frame: u64, rep_count: u32, form_issues: &str, elbow: f32) -> AnalysisRecord {
        AnalysisRecord {
            frame,
            timestamp_ms: 1_000 + frame as i64 * 100,
            series_number: 1,
            rep_count,
            down: false,
            form_issues: form_issues.to_string(),
            angles: vec![DisplayAngle {
                name: "elbow".to_string(),
                value: elbow,
                joint_indices: [16, 14, 12],
            }],
            landmarks_of_interest: BTreeMap::new(),
        }
    }

    fn completed(rep_goal: u32, analysis: Vec<AnalysisRecord>) -> CompletedWorkout {
        CompletedWorkout {
            metadata: WorkoutMetadata {
                id: "w1".to_string(),
                exercise: ExerciseKind::PushUps,
                started_at: 1_000,
                rep_goal,
                strictness: Strictness::Moderate,
                strictness_definition: 10.0,
                left_side: false,
                series_number: 1,
                device_id: "test".to_string(),
                landmarks_of_interest: BTreeMap::new(),
            },
            analysis,
            raw_landmarks: vec![],
        }
    }

    #[test]
    fn test_warmup_frames_excluded() {
        let mut analysis: Vec<AnalysisRecord> = (0..15)
            .map(|f| record(f, 0, "knees on floor", 170.0))
            .collect();
        analysis.extend((15..20).map(|f| record(f, 0, GOOD_FORM, 170.0)));

        let metrics = SessionMetrics::calculate(&completed(2, analysis), 10);
        assert_eq!(metrics.warmup_start_frame, 5);
        assert_eq!(metrics.form_issue_counts["knees on floor"], 10);
    }

    #[test]
    fn test_warmup_start_clamped_at_zero() {
        let analysis = vec![record(0, 0, "knees on floor", 170.0), record(1, 0, GOOD_FORM, 170.0)];
        let metrics = SessionMetrics::calculate(&completed(1, analysis), 10);
        assert_eq!(metrics.warmup_start_frame, 0);
    }

    #[test]
    fn test_rep_spans_and_average() {
        let analysis = vec![
            record(0, 0, GOOD_FORM, 170.0),
            record(1, 0, GOOD_FORM, 80.0),
            record(2, 1, GOOD_FORM, 170.0),
            record(3, 1, GOOD_FORM, 80.0),
            record(4, 1, GOOD_FORM, 85.0),
            record(5, 2, GOOD_FORM, 170.0),
        ];
        let metrics = SessionMetrics::calculate(&completed(2, analysis), 10);

        assert_eq!(metrics.total_repetitions, 2);
        // The frame completing rep 2 opens rep 3, which is beyond the goal
        assert_eq!(metrics.rep_spans.len(), 2);
        assert_eq!(metrics.rep_spans[0], RepSpan { rep: 1, start_frame: 0, end_frame: 1, duration_ms: 100 });
        assert_eq!(metrics.rep_spans[1].duration_ms, 200);
        assert!((metrics.average_rep_duration_ms - 150.0).abs() < f64::EPSILON);
        assert_eq!(metrics.duration_ms, 500);
        assert!(metrics.form_issue_counts.is_empty());
        assert!(metrics.worst_reps.is_empty());
    }

    #[test]
    fn test_worst_reps_ranked() {
        let analysis = vec![
            record(0, 0, GOOD_FORM, 170.0),
            record(1, 0, "knees on floor", 80.0),
            record(2, 1, "hips not in line with body", 80.0),
            record(3, 1, "hips not in line with body", 80.0),
            record(4, 2, "knees on floor", 80.0),
            record(5, 3, "knees on floor", 80.0),
            record(6, 3, "knees on floor", 80.0),
            record(7, 3, "knees on floor", 80.0),
        ];
        let metrics = SessionMetrics::calculate(&completed(5, analysis), 10);

        assert_eq!(metrics.worst_reps, vec![(4, 3), (2, 2), (1, 1)]);
        assert_eq!(metrics.form_issue_counts["knees on floor"], 5);
        assert_eq!(metrics.form_issue_counts["hips not in line with body"], 2);
        assert!(!metrics.form_issue_counts.contains_key(GOOD_FORM));
    }

    #[test]
    fn test_angle_stats() {
        let analysis = vec![
            record(0, 0, GOOD_FORM, 170.0),
            record(1, 0, GOOD_FORM, 80.0),
            record(2, 1, GOOD_FORM, 150.0),
        ];
        let metrics = SessionMetrics::calculate(&completed(1, analysis), 10);
        let elbow = &metrics.angle_stats["elbow"];
        assert_eq!(elbow.min, 80.0);
        assert_eq!(elbow.max, 170.0);
        assert_eq!(elbow.count, 3);
        assert!((elbow.mean - 133.333).abs() < 0.01);
    }

    #[test]
    fn test_empty_workout() {
        let metrics = SessionMetrics::calculate(&completed(3, vec![]), 10);
        assert_eq!(metrics.total_repetitions, 0);
        assert_eq!(metrics.average_rep_duration_ms, 0.0);
        assert_eq!(metrics.duration_ms, 0);
        assert!(metrics.angle_stats.is_empty());
    }
}
