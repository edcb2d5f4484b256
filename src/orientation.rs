//! Accelerometer + magnetometer fusion into a throttled, smoothed
//! orientation reading.

use std::time::Duration;

use nalgebra::{Matrix3, Vector3};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::angles::{normalize_angle, rad_to_deg, signed_angle_difference};
use crate::config::EstimatorConfig;
use crate::error::SensorError;
use crate::types::{OrientationReading, OrientationSample, SensorKind};

/// Below this the horizontal field is too weak to define north (free fall,
/// magnetic pole, or no magnetometer sample yet).
const MIN_FIELD_NORM: f64 = 0.1;

/// Which motion sensors the host device has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorCapabilities {
    pub accelerometer: bool,
    pub magnetometer: bool,
}

impl SensorCapabilities {
    pub fn supports_guidance(&self) -> bool {
        self.accelerometer && self.magnetometer
    }

    pub fn require(&self) -> Result<(), SensorError> {
        if self.supports_guidance() {
            Ok(())
        } else {
            Err(SensorError::Unavailable {
                accelerometer: self.accelerometer,
                magnetometer: self.magnetometer,
            })
        }
    }
}

/// Device-to-world rotation from a gravity and a geomagnetic vector.
///
/// Rows are east, north and up expressed in device coordinates. `None` when
/// either vector is degenerate.
pub fn rotation_matrix(gravity: &Vector3<f64>, magnetic: &Vector3<f64>) -> Option<Matrix3<f64>> {
    let east = magnetic.cross(gravity);
    let east_norm = east.norm();
    let gravity_norm = gravity.norm();
    if east_norm < MIN_FIELD_NORM || gravity_norm == 0.0 {
        return None;
    }
    let east = east / east_norm;
    let up = gravity / gravity_norm;
    let north = up.cross(&east);
    Some(Matrix3::from_rows(&[
        east.transpose(),
        north.transpose(),
        up.transpose(),
    ]))
}

/// (azimuth, pitch, roll) in radians from a [`rotation_matrix`].
pub fn orientation_angles(r: &Matrix3<f64>) -> (f64, f64, f64) {
    let azimuth = r[(0, 1)].atan2(r[(1, 1)]);
    let pitch = (-r[(2, 1)]).clamp(-1.0, 1.0).asin();
    let roll = (-r[(2, 0)]).atan2(r[(2, 2)]);
    (azimuth, pitch, roll)
}

#[derive(Debug)]
struct FusionState {
    gravity: Vector3<f64>,
    magnetic: Vector3<f64>,
    last_emit: Option<Duration>,
    smoothed: Option<(f64, f64, f64)>,
}

impl Default for FusionState {
    fn default() -> Self {
        Self {
            gravity: Vector3::zeros(),
            magnetic: Vector3::zeros(),
            last_emit: None,
            smoothed: None,
        }
    }
}

/// Fuses the two sensor channels.
///
/// Both vectors and the throttle sit behind one lock, so an emission always
/// sees a consistent pair even when the channels are delivered from
/// different threads.
#[derive(Debug)]
pub struct OrientationEstimator {
    state: Mutex<FusionState>,
    config: EstimatorConfig,
}

impl OrientationEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            state: Mutex::new(FusionState::default()),
            config,
        }
    }

    /// Fails when the device cannot drive guidance at all.
    pub fn with_capabilities(
        capabilities: SensorCapabilities,
        config: EstimatorConfig,
    ) -> Result<Self, SensorError> {
        capabilities.require()?;
        Ok(Self::new(config))
    }

    /// Zeroes both vectors and forgets the throttle and filter history.
    pub fn reset(&self) {
        *self.state.lock() = FusionState::default();
    }

    /// Records a sample and returns a reading if the emit interval has
    /// elapsed since the last one.
    pub fn on_sample(&self, sample: OrientationSample) -> Option<OrientationReading> {
        let mut state = self.state.lock();
        let [x, y, z] = sample.values;
        match sample.kind {
            // |z| keeps the device "face up" so the azimuth does not flip
            // by 180° around vertical
            SensorKind::Accelerometer => state.gravity = Vector3::new(x, y, z.abs()),
            SensorKind::Magnetometer => state.magnetic = Vector3::new(x, y, z),
        }

        if let Some(last) = state.last_emit {
            if sample.timestamp.saturating_sub(last) < self.config.emit_interval {
                return None;
            }
        }

        let Some(r) = rotation_matrix(&state.gravity, &state.magnetic) else {
            trace!("degenerate sensor vectors, skipping emission");
            return None;
        };
        let (azimuth, pitch, roll) = orientation_angles(&r);
        let raw = (
            normalize_angle(rad_to_deg(azimuth)),
            rad_to_deg(pitch),
            rad_to_deg(roll),
        );

        let alpha = self.config.smoothing.clamp(f64::EPSILON, 1.0);
        let (azimuth, pitch, roll) = match state.smoothed {
            None => raw,
            Some((az, p, rl)) => (
                normalize_angle(az + alpha * signed_angle_difference(az, raw.0)),
                p + alpha * (raw.1 - p),
                rl + alpha * (raw.2 - rl),
            ),
        };
        state.smoothed = Some((azimuth, pitch, roll));
        state.last_emit = Some(sample.timestamp);

        Some(OrientationReading {
            pitch,
            roll,
            azimuth,
            timestamp: sample.timestamp,
        })
    }

    /// Consumes a sensor stream, forwarding each emitted reading. Returns
    /// when the input closes or the output receiver is dropped.
    pub async fn run(
        &self,
        mut samples: mpsc::Receiver<OrientationSample>,
        readings: mpsc::Sender<OrientationReading>,
    ) {
        while let Some(sample) = samples.recv().await {
            if let Some(reading) = self.on_sample(sample) {
                if readings.send(reading).await.is_err() {
                    debug!("orientation consumer gone, stopping");
                    return;
                }
            }
        }
        debug!("sensor stream closed");
    }
}
