//! Animation value objects.
//!
//! These are the wire-level types the surrounding layer serializes for its
//! visualization front end: a genome id plus ordered frames, each frame a
//! timestamp plus ordered drone states.

use serde::{Deserialize, Serialize};

/// Position and color of a single drone at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroneState {
    /// X coordinate in meters.
    pub x: f64,
    /// Y coordinate in meters.
    pub y: f64,
    /// Z coordinate in meters.
    pub z: f64,
    /// Red channel, 0-255.
    pub r: u8,
    /// Green channel, 0-255.
    pub g: u8,
    /// Blue channel, 0-255.
    pub b: u8,
}

/// All drone states at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Time in seconds since animation start.
    pub t: f64,
    /// Drone states, in layout order.
    pub drones: Vec<DroneState>,
}

/// A complete drone animation generated from one genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    /// Id of the genome that produced this animation.
    pub id: u64,
    /// Ordered frames.
    pub frames: Vec<Frame>,
}

impl Animation {
    /// Number of frames.
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of drones per frame (zero for an empty animation).
    #[must_use]
    pub fn num_drones(&self) -> usize {
        self.frames.first().map_or(0, |f| f.drones.len())
    }
}
