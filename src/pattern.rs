//! Time-integrated pattern generation.
//!
//! A compiled CPPN defines a velocity/color field over space. The generator
//! drops drones at a deterministic initial layout and integrates the
//! velocity field with explicit first-order Euler steps, sampling the color
//! field fresh at every (possibly moved) position. Generation is a pure
//! function of its arguments: identical genome, layout, duration and fps
//! always yield bit-identical output.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::animation::{Animation, DroneState, Frame};
use crate::error::{EvolutionError, Result};
use crate::evaluator::CppnEvaluator;

/// Deterministic, genome-independent initial drone layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Layout {
    /// Drones evenly spaced on a circle of the given radius in the z = 0
    /// plane, starting at angle 0 (drone 0 sits at `(radius, 0, 0)`).
    Circle {
        /// Circle radius in meters.
        radius: f64,
    },
    /// A centered 3D lattice, filled z-layer by z-layer, row by row.
    Grid {
        /// Cells along X.
        nx: usize,
        /// Cells along Y.
        ny: usize,
        /// Cells along Z.
        nz: usize,
        /// Cell spacing in meters.
        spacing: f64,
    },
}

impl Layout {
    /// Compute the initial position of every drone.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvalidConfig`] when the drone count and
    /// layout disagree; the layout is never silently reshaped.
    pub fn positions(&self, num_drones: usize) -> Result<Vec<[f64; 3]>> {
        if num_drones == 0 {
            return Err(EvolutionError::InvalidConfig(
                "num_drones must be positive".into(),
            ));
        }

        match *self {
            Layout::Circle { radius } => {
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(EvolutionError::InvalidConfig(format!(
                        "circle radius must be positive and finite, got {radius}"
                    )));
                }
                let positions = (0..num_drones)
                    .map(|i| {
                        let angle = TAU * i as f64 / num_drones as f64;
                        [radius * angle.cos(), radius * angle.sin(), 0.0]
                    })
                    .collect();
                Ok(positions)
            }
            Layout::Grid {
                nx,
                ny,
                nz,
                spacing,
            } => {
                if !(spacing.is_finite() && spacing > 0.0) {
                    return Err(EvolutionError::InvalidConfig(format!(
                        "grid spacing must be positive and finite, got {spacing}"
                    )));
                }
                let expected = nx * ny * nz;
                if expected == 0 || num_drones != expected {
                    return Err(EvolutionError::InvalidConfig(format!(
                        "num_drones ({num_drones}) must match grid size \
                         ({nx}x{ny}x{nz} = {expected})"
                    )));
                }

                // Center the lattice on the origin.
                let x_offset = -((nx - 1) as f64) * spacing / 2.0;
                let y_offset = -((ny - 1) as f64) * spacing / 2.0;
                let z_offset = -((nz - 1) as f64) * spacing / 2.0;

                let positions = (0..num_drones)
                    .map(|i| {
                        let z_idx = i / (nx * ny);
                        let rem = i % (nx * ny);
                        let y_idx = rem / nx;
                        let x_idx = rem % nx;
                        [
                            x_idx as f64 * spacing + x_offset,
                            y_idx as f64 * spacing + y_offset,
                            z_idx as f64 * spacing + z_offset,
                        ]
                    })
                    .collect();
                Ok(positions)
            }
        }
    }
}

/// Layout and timing parameters for pattern generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Initial drone layout.
    pub layout: Layout,
    /// Frames per second of generated animations.
    pub fps: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Circle { radius: 1.5 },
            fps: 30.0,
        }
    }
}

impl PatternConfig {
    /// Validate the timing parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvalidConfig`] for a non-positive or
    /// non-finite fps.
    pub fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(EvolutionError::InvalidConfig(format!(
                "fps must be positive and finite, got {}",
                self.fps
            )));
        }
        Ok(())
    }
}

/// Generate a drone animation by time-integrating the network's velocity
/// field from the given initial positions.
///
/// Produces `floor(duration * fps) + 1` frames at times `index / fps`. Each
/// frame snapshots the current positions and freshly queried colors; all
/// frames except the last then advance every drone by `velocity * dt`
/// (explicit Euler, dt = 1/fps).
///
/// # Errors
///
/// Returns [`EvolutionError::InvalidArgument`] for a non-positive duration
/// or fps, before any work is done.
pub fn generate(
    evaluator: &mut CppnEvaluator,
    initial_positions: &[[f64; 3]],
    genome_id: u64,
    duration: f64,
    fps: f64,
) -> Result<Animation> {
    if !(duration.is_finite() && duration > 0.0) {
        return Err(EvolutionError::InvalidArgument(format!(
            "duration must be positive and finite, got {duration}"
        )));
    }
    if !(fps.is_finite() && fps > 0.0) {
        return Err(EvolutionError::InvalidArgument(format!(
            "fps must be positive and finite, got {fps}"
        )));
    }

    let num_frames = (duration * fps).floor() as usize + 1;
    let dt = 1.0 / fps;

    let mut positions: Vec<[f64; 3]> = initial_positions.to_vec();
    let mut velocities: Vec<[f64; 3]> = vec![[0.0; 3]; positions.len()];
    let mut frames = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let t = frame_idx as f64 / fps;

        let mut drones = Vec::with_capacity(positions.len());
        for (drone_idx, &[x, y, z]) in positions.iter().enumerate() {
            let sample = evaluator.query(x, y, z);
            drones.push(DroneState {
                x,
                y,
                z,
                r: sample.color[0],
                g: sample.color[1],
                b: sample.color[2],
            });
            velocities[drone_idx] = sample.velocity;
        }
        frames.push(Frame { t, drones });

        // Euler step; the final frame is a snapshot only.
        if frame_idx < num_frames - 1 {
            for (position, velocity) in positions.iter_mut().zip(&velocities) {
                position[0] += velocity[0] * dt;
                position[1] += velocity[1] * dt;
                position[2] += velocity[2] * dt;
            }
        }
    }

    Ok(Animation {
        id: genome_id,
        frames,
    })
}
