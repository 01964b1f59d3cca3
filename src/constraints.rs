//! Geometric and kinematic validation of generated animations.
//!
//! Checks every frame of an animation against a flight box, horizontal and
//! vertical speed limits, and a minimum pairwise separation. Checking is a
//! pure function of its inputs, so a whole generation can be validated in
//! parallel by the caller.

use serde::{Deserialize, Serialize};

use crate::animation::{Animation, DroneState};

/// Constraint thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstraintParams {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
    /// Maximum horizontal (xy-plane) speed in m/s.
    pub max_horizontal_speed: f64,
    /// Maximum vertical (z-axis) speed in m/s.
    pub max_vertical_speed: f64,
    /// Minimum allowed distance between any two drones, in meters.
    pub min_distance: f64,
    /// Frame interval used for speed calculations, in seconds.
    pub dt: f64,
}

impl Default for ConstraintParams {
    fn default() -> Self {
        Self {
            x_min: -8.5,
            x_max: 8.5,
            y_min: -8.5,
            y_max: 8.5,
            z_min: -6.5,
            z_max: 6.5,
            max_horizontal_speed: 5.0,
            max_vertical_speed: 2.5,
            min_distance: 0.5,
            dt: 1.0 / 30.0,
        }
    }
}

/// Per-animation constraint check result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
    /// Id of the checked genome.
    pub genome_id: u64,
    /// Drone-frames outside the flight box.
    pub bounds_violations: usize,
    /// Largest single out-of-bounds overshoot observed, in meters.
    pub max_bounds_violation: f64,
    /// Drone-frames exceeding the horizontal speed limit.
    pub horizontal_speed_violations: usize,
    /// Drone-frames exceeding the vertical speed limit.
    pub vertical_speed_violations: usize,
    /// Drone pairs closer than the minimum separation.
    pub distance_violations: usize,
    /// Smallest pairwise distance observed, if any pair existed.
    pub min_distance_observed: Option<f64>,
}

impl ConstraintResult {
    fn new(genome_id: u64) -> Self {
        Self {
            genome_id,
            bounds_violations: 0,
            max_bounds_violation: 0.0,
            horizontal_speed_violations: 0,
            vertical_speed_violations: 0,
            distance_violations: 0,
            min_distance_observed: None,
        }
    }

    /// True iff all four violation counts are zero.
    #[must_use]
    pub fn passes_all(&self) -> bool {
        self.bounds_violations == 0
            && self.horizontal_speed_violations == 0
            && self.vertical_speed_violations == 0
            && self.distance_violations == 0
    }
}

/// Aggregated pass counts for a batch of animations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSummary {
    pub total: usize,
    pub pass_bounds: usize,
    pub pass_h_speed: usize,
    pub pass_v_speed: usize,
    pub pass_distance: usize,
    pub pass_all: usize,
}

/// Result of checking a batch of animations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub results: Vec<ConstraintResult>,
    pub summary: ConstraintSummary,
}

/// Check one animation against the given constraints.
#[must_use]
pub fn check(animation: &Animation, params: &ConstraintParams) -> ConstraintResult {
    let mut result = ConstraintResult::new(animation.id);

    for (frame_idx, frame) in animation.frames.iter().enumerate() {
        for drone in &frame.drones {
            let violation = bounds_violation(drone, params);
            if violation > 0.0 {
                result.bounds_violations += 1;
                result.max_bounds_violation = result.max_bounds_violation.max(violation);
            }
        }

        if frame_idx > 0 {
            let prev = &animation.frames[frame_idx - 1].drones;
            for (curr, prev) in frame.drones.iter().zip(prev) {
                let (h_speed, v_speed) = speeds(prev, curr, params.dt);
                if h_speed > params.max_horizontal_speed {
                    result.horizontal_speed_violations += 1;
                }
                if v_speed > params.max_vertical_speed {
                    result.vertical_speed_violations += 1;
                }
            }
        }

        for i in 0..frame.drones.len() {
            for j in (i + 1)..frame.drones.len() {
                let dist = distance(&frame.drones[i], &frame.drones[j]);
                result.min_distance_observed = Some(
                    result
                        .min_distance_observed
                        .map_or(dist, |min| min.min(dist)),
                );
                if dist < params.min_distance {
                    result.distance_violations += 1;
                }
            }
        }
    }

    result
}

/// Check a batch of animations, aggregating per-category pass counts.
#[must_use]
pub fn check_all(animations: &[Animation], params: &ConstraintParams) -> ConstraintReport {
    let results: Vec<ConstraintResult> = animations.iter().map(|a| check(a, params)).collect();

    let summary = ConstraintSummary {
        total: results.len(),
        pass_bounds: results.iter().filter(|r| r.bounds_violations == 0).count(),
        pass_h_speed: results
            .iter()
            .filter(|r| r.horizontal_speed_violations == 0)
            .count(),
        pass_v_speed: results
            .iter()
            .filter(|r| r.vertical_speed_violations == 0)
            .count(),
        pass_distance: results
            .iter()
            .filter(|r| r.distance_violations == 0)
            .count(),
        pass_all: results.iter().filter(|r| r.passes_all()).count(),
    };

    log::debug!(
        "constraint batch: {}/{} animations pass all checks",
        summary.pass_all,
        summary.total
    );

    ConstraintReport { results, summary }
}

/// Largest per-axis overshoot outside the flight box, zero when inside.
fn bounds_violation(drone: &DroneState, params: &ConstraintParams) -> f64 {
    [
        params.x_min - drone.x,
        drone.x - params.x_max,
        params.y_min - drone.y,
        drone.y - params.y_max,
        params.z_min - drone.z,
        drone.z - params.z_max,
    ]
    .into_iter()
    .fold(0.0, f64::max)
}

/// Horizontal and vertical speed between two consecutive states.
fn speeds(prev: &DroneState, curr: &DroneState, dt: f64) -> (f64, f64) {
    let dx = curr.x - prev.x;
    let dy = curr.y - prev.y;
    let dz = curr.z - prev.z;
    ((dx * dx + dy * dy).sqrt() / dt, dz.abs() / dt)
}

/// Euclidean 3D distance between two drones.
fn distance(a: &DroneState, b: &DroneState) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dz = b.z - a.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Frame;

    fn state(x: f64, y: f64, z: f64) -> DroneState {
        DroneState {
            x,
            y,
            z,
            r: 127,
            g: 255,
            b: 127,
        }
    }

    fn static_animation(positions: &[[f64; 3]], num_frames: usize) -> Animation {
        let drones: Vec<DroneState> = positions.iter().map(|&[x, y, z]| state(x, y, z)).collect();
        Animation {
            id: 0,
            frames: (0..num_frames)
                .map(|i| Frame {
                    t: i as f64 / 30.0,
                    drones: drones.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_static_in_bounds_animation_passes() {
        let animation = static_animation(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]], 30);
        let result = check(&animation, &ConstraintParams::default());

        assert!(result.passes_all());
        assert_eq!(result.bounds_violations, 0);
        assert_eq!(result.horizontal_speed_violations, 0);
        assert_eq!(result.vertical_speed_violations, 0);
        assert_eq!(result.distance_violations, 0);
        assert!((result.min_distance_observed.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_violation_counted_with_magnitude() {
        let animation = static_animation(&[[10.0, 0.0, 0.0]], 2);
        let result = check(&animation, &ConstraintParams::default());

        // One drone out of bounds in each of two frames.
        assert_eq!(result.bounds_violations, 2);
        assert!((result.max_bounds_violation - 1.5).abs() < 1e-12);
        assert!(!result.passes_all());
    }

    #[test]
    fn test_speed_violations() {
        let params = ConstraintParams::default();
        // 0.5 m in one 1/30 s frame = 15 m/s horizontally.
        let animation = Animation {
            id: 1,
            frames: vec![
                Frame {
                    t: 0.0,
                    drones: vec![state(0.0, 0.0, 0.0)],
                },
                Frame {
                    t: 1.0 / 30.0,
                    drones: vec![state(0.5, 0.0, 0.2)],
                },
            ],
        };
        let result = check(&animation, &params);

        assert_eq!(result.horizontal_speed_violations, 1);
        // 0.2 m vertically in 1/30 s = 6 m/s > 2.5 m/s.
        assert_eq!(result.vertical_speed_violations, 1);
    }

    #[test]
    fn test_separation_violations() {
        let animation = static_animation(&[[0.0, 0.0, 0.0], [0.3, 0.0, 0.0]], 1);
        let result = check(&animation, &ConstraintParams::default());

        assert_eq!(result.distance_violations, 1);
        assert!((result.min_distance_observed.unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_single_drone_has_no_pairs() {
        let animation = static_animation(&[[0.0, 0.0, 0.0]], 5);
        let result = check(&animation, &ConstraintParams::default());

        assert_eq!(result.distance_violations, 0);
        assert!(result.min_distance_observed.is_none());
        assert!(result.passes_all());
    }

    #[test]
    fn test_check_all_summary() {
        let good = static_animation(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], 3);
        let mut bad = static_animation(&[[10.0, 0.0, 0.0], [11.0, 0.0, 0.0]], 3);
        bad.id = 1;

        let report = check_all(&[good, bad], &ConstraintParams::default());

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.pass_bounds, 1);
        assert_eq!(report.summary.pass_h_speed, 2);
        assert_eq!(report.summary.pass_v_speed, 2);
        assert_eq!(report.summary.pass_distance, 2);
        assert_eq!(report.summary.pass_all, 1);
    }
}
