//! Nearest-descriptor matching
//!
//! Scans active students and their reference descriptors for the closest one
//! strictly below the recognition threshold. O(students × descriptors), which
//! is fine at school-roster scale.

use super::descriptor::euclidean_distance;
use sams_common::db::Student;
use tracing::debug;

/// Best match for a probe descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub student: &'a Student,
    pub distance: f64,
    /// Convenience score 0-100, not used for the decision
    pub confidence: u32,
}

/// Confidence score for a distance: `round((1 - distance) * 100)`, floored at 0
pub fn confidence_from_distance(distance: f64) -> u32 {
    let score = ((1.0 - distance) * 100.0).round();
    if score.is_nan() || score <= 0.0 {
        0
    } else {
        score as u32
    }
}

/// Find the closest active student under `threshold`
///
/// A pair becomes the current best only if its distance is strictly less than
/// both the threshold and the best distance so far, so ties keep the first seen
/// (candidate order, then descriptor order). Inactive students and students
/// without descriptors are skipped.
pub fn find_best_match<'a>(
    probe: &[f64],
    candidates: &'a [Student],
    threshold: f64,
) -> Option<MatchResult<'a>> {
    let mut best: Option<(&'a Student, f64)> = None;

    for student in candidates
        .iter()
        .filter(|s| s.is_active() && !s.descriptors.is_empty())
    {
        for descriptor in &student.descriptors {
            let distance = euclidean_distance(probe, descriptor);
            let beats_best = best.map_or(true, |(_, best_distance)| distance < best_distance);

            if distance < threshold && beats_best {
                best = Some((student, distance));
            }
        }
    }

    match best {
        Some((student, distance)) => {
            debug!(
                student_id = %student.student_id,
                distance,
                threshold,
                "Descriptor matched"
            );
            Some(MatchResult {
                student,
                distance,
                confidence: confidence_from_distance(distance),
            })
        }
        None => {
            debug!(
                candidates = candidates.len(),
                threshold,
                "No descriptor under threshold"
            );
            None
        }
    }
}
