//! Rolling motion log for a tracked transform.
//!
//! A `KinematicsTracker` records one sample per simulation tick into a fixed
//! ring buffer and answers "over the last N seconds" questions from it. Slots
//! are not stored chronologically: the cursor wraps around and overwrites the
//! oldest entry. Unwritten slots carry `UNFILLED_DT` and are never counted.

use nalgebra::{UnitQuaternion, Vector3};
use thiserror::Error;
use tracing::warn;

use super::constants::tracking as consts;
use super::math::{forward_of, right_of, wrap_index};

/// What the tracker stores in the position slot of each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackedQuantity {
    /// World-space translation.
    #[default]
    Translation,
    /// Euler angles (roll, pitch, yaw) in radians.
    Rotation,
}

/// Pose handed to the tracker once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
}

impl Pose {
    pub fn new(position: Vector3<f32>, forward: Vector3<f32>, right: Vector3<f32>) -> Self {
        Self {
            position,
            forward,
            right,
        }
    }

    /// Pose at `position` facing +Z.
    pub fn at(position: Vector3<f32>) -> Self {
        Self::new(position, Vector3::z(), Vector3::x())
    }
}

/// One ring buffer slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub acceleration: Vector3<f32>,
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
    pub dt: f32,
}

impl MotionSample {
    const UNFILLED: Self = Self {
        position: Vector3::new(0.0, 0.0, 0.0),
        velocity: Vector3::new(0.0, 0.0, 0.0),
        acceleration: Vector3::new(0.0, 0.0, 0.0),
        forward: Vector3::new(0.0, 0.0, 1.0),
        right: Vector3::new(1.0, 0.0, 0.0),
        dt: consts::UNFILLED_DT,
    };

    pub fn is_filled(&self) -> bool {
        self.dt != consts::UNFILLED_DT
    }
}

/// Derived quantity selectable for windowed averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionField {
    Position,
    Velocity,
    Acceleration,
}

impl MotionField {
    fn read(self, sample: &MotionSample) -> Vector3<f32> {
        match self {
            MotionField::Position => sample.position,
            MotionField::Velocity => sample.velocity,
            MotionField::Acceleration => sample.acceleration,
        }
    }
}

/// Orientation read back from the log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KinematicsError {
    #[error("Sample index {index} out of range for a log of {capacity} samples")]
    IndexOutOfRange { index: usize, capacity: usize },
}

/// Ring buffer of per-tick motion samples with windowed queries.
#[derive(Debug, Clone)]
pub struct KinematicsTracker {
    quantity: TrackedQuantity,
    samples: Vec<MotionSample>,
    /// Next slot to be written.
    cursor: usize,
    /// Sum of the dt of every filled slot.
    max_log_duration: f32,
}

impl Default for KinematicsTracker {
    fn default() -> Self {
        Self::new(TrackedQuantity::Translation)
    }
}

impl KinematicsTracker {
    pub fn new(quantity: TrackedQuantity) -> Self {
        Self::with_capacity(quantity, consts::LOG_BUFFER_SIZE)
    }

    pub fn with_capacity(quantity: TrackedQuantity, capacity: usize) -> Self {
        assert!(capacity > 0, "kinematics log needs at least one slot");
        Self {
            quantity,
            samples: vec![MotionSample::UNFILLED; capacity],
            cursor: 0,
            max_log_duration: 0.0,
        }
    }

    pub fn quantity(&self) -> TrackedQuantity {
        self.quantity
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.samples.iter().filter(|s| s.is_filled()).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.samples[self.slot(0)].is_filled()
    }

    /// Total time covered by the recorded samples.
    pub fn max_log_duration(&self) -> f32 {
        self.max_log_duration
    }

    /// Records a transform, deriving the tracked quantity and its basis vectors.
    pub fn record_transform(
        &mut self,
        translation: Vector3<f32>,
        rotation: &UnitQuaternion<f32>,
        dt: f32,
    ) {
        let position = match self.quantity {
            TrackedQuantity::Translation => translation,
            TrackedQuantity::Rotation => {
                let (roll, pitch, yaw) = rotation.euler_angles();
                Vector3::new(roll, pitch, yaw)
            }
        };
        self.record(Pose::new(position, forward_of(rotation), right_of(rotation)), dt);
    }

    /// Writes a sample at the cursor, overwriting the oldest slot.
    pub fn record(&mut self, pose: Pose, dt: f32) {
        if !(dt > 0.0 && dt.is_finite()) {
            warn!(dt, "[Kinematics] Ignoring sample with non-positive delta time");
            return;
        }

        let previous = self.samples[self.slot(0)];
        let overwritten = self.samples[self.cursor];
        if overwritten.is_filled() {
            self.max_log_duration -= overwritten.dt;
        }
        self.max_log_duration += dt;

        let (velocity, acceleration) = if previous.is_filled() {
            let velocity = (pose.position - previous.position) / dt;
            (velocity, (velocity - previous.velocity) / dt)
        } else {
            (Vector3::zeros(), Vector3::zeros())
        };

        self.samples[self.cursor] = MotionSample {
            position: pose.position,
            velocity,
            acceleration,
            forward: pose.forward,
            right: pose.right,
            dt,
        };
        self.cursor = (self.cursor + 1) % self.samples.len();
    }

    /// Buffer slot of the k-th most recent sample (k = 0 is the newest).
    pub fn sample_index(&self, k: usize) -> Result<usize, KinematicsError> {
        if k >= self.samples.len() {
            return Err(KinematicsError::IndexOutOfRange {
                index: k,
                capacity: self.samples.len(),
            });
        }
        Ok(self.slot(k))
    }

    /// The k-th most recent sample, if it has been written.
    pub fn sample(&self, k: usize) -> Option<&MotionSample> {
        let index = self.sample_index(k).ok()?;
        let sample = &self.samples[index];
        sample.is_filled().then_some(sample)
    }

    pub fn latest(&self) -> Option<&MotionSample> {
        self.sample(0)
    }

    fn slot(&self, k: usize) -> usize {
        wrap_index(self.cursor as isize - 1 - k as isize, self.samples.len())
    }

    pub fn clamp_duration(&self, duration: f32) -> f32 {
        duration.clamp(0.0, self.max_log_duration)
    }

    /// Number of samples, newest first, needed to span `duration` seconds.
    pub fn count_samples_covering(&self, duration: f32) -> usize {
        let duration = self.clamp_duration(duration);
        let mut covered = 0.0;
        let mut count = 0;
        while count < self.samples.len() {
            let sample = &self.samples[self.slot(count)];
            if covered > duration || !sample.is_filled() {
                break;
            }
            covered += sample.dt;
            count += 1;
        }
        count
    }

    /// Average of `field` over the last `duration` seconds.
    ///
    /// Falls back to the newest sample when the window holds none.
    pub fn average_over(&self, duration: f32, field: MotionField) -> Vector3<f32> {
        let count = self.count_samples_covering(duration);
        if count == 0 {
            return field.read(&self.samples[self.slot(0)]);
        }

        let sum: Vector3<f32> = (0..count)
            .map(|k| field.read(&self.samples[self.slot(k)]))
            .sum();
        sum / count as f32
    }

    pub fn average_velocity(&self, duration: f32) -> Vector3<f32> {
        self.average_over(duration, MotionField::Velocity)
    }

    pub fn average_acceleration(&self, duration: f32) -> Vector3<f32> {
        self.average_over(duration, MotionField::Acceleration)
    }

    /// Average tick length over the last `duration` seconds.
    pub fn average_delta_time(&self, duration: f32) -> Option<f32> {
        let newest = self.latest()?;
        let count = self.count_samples_covering(duration);
        if count == 0 {
            return Some(newest.dt);
        }
        let sum: f32 = (0..count).map(|k| self.samples[self.slot(k)].dt).sum();
        Some(sum / count as f32)
    }

    /// Orientation recorded `time_ago` seconds before the newest sample.
    ///
    /// Returns the oldest recorded orientation when the log does not reach that far.
    pub fn pose_at_time_ago(&self, time_ago: f32) -> Orientation {
        let time_ago = self.clamp_duration(time_ago);
        let mut elapsed = 0.0;
        let mut oldest = &self.samples[self.slot(0)];
        for k in 0..self.samples.len() {
            let sample = &self.samples[self.slot(k)];
            if !sample.is_filled() {
                break;
            }
            if elapsed >= time_ago {
                return Orientation {
                    forward: sample.forward,
                    right: sample.right,
                };
            }
            elapsed += sample.dt;
            oldest = sample;
        }
        Orientation {
            forward: oldest.forward,
            right: oldest.right,
        }
    }

    /// Net change of the tracked quantity across the window.
    pub fn delta_position(&self, duration: f32) -> Vector3<f32> {
        let count = self.count_samples_covering(duration);
        if count == 0 {
            return Vector3::zeros();
        }
        self.samples[self.slot(0)].position - self.samples[self.slot(count - 1)].position
    }

    /// Per-axis distance traveled across the window, ignoring direction.
    pub fn amount_traveled(&self, duration: f32) -> Vector3<f32> {
        let count = self.count_samples_covering(duration);
        (0..count)
            .map(|k| {
                let sample = &self.samples[self.slot(k)];
                sample.velocity.abs() * sample.dt
            })
            .sum()
    }
}
