//! Target selection, discrepancy tracking and feedback cadence.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, Local, TimeZone, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::angles::{optimal_tilt, signed_angle_difference, year_round_tilt};
use crate::config::GuidanceConfig;
use crate::location::{resolve_location, LocationSource};
use crate::remote::{Freshness, RemoteEstimateCache};
use crate::series::window_average_tilt;
use crate::store::{GuidanceSettings, KeyValueStore};
use crate::types::{
    AlignmentState, AngleMode, FeedbackCadence, GeoPoint, GuidanceUpdate, OrientationReading,
    TargetSource, TiltHint, TiltTarget,
};

/// Target computed from the geometric model alone. The calendar day is
/// taken in `now`'s own time zone.
pub fn local_target<Tz: TimeZone>(
    location: GeoPoint,
    mode: AngleMode,
    now: &DateTime<Tz>,
    config: &GuidanceConfig,
) -> TiltTarget {
    let lat = location.latitude();
    let angle = match mode {
        AngleMode::Fixed => year_round_tilt(lat),
        AngleMode::Daily => optimal_tilt(lat, now.ordinal() as i32),
        AngleMode::NextThirtyDays => window_average_tilt(lat, now.date_naive(), config.window_days),
    };
    TiltTarget::new(angle, TargetSource::Local, mode, now.with_timezone(&Utc), location)
}

pub fn classify(
    tilt_discrepancy: f64,
    azimuth_discrepancy: f64,
    roll: f64,
    config: &GuidanceConfig,
) -> AlignmentState {
    let combined = tilt_discrepancy.abs().max(azimuth_discrepancy.abs());
    let vertical = roll.abs() <= config.vertical_roll_deg;
    if tilt_discrepancy.abs() <= config.on_target_deg
        && azimuth_discrepancy.abs() <= config.on_target_deg
        && vertical
    {
        AlignmentState::OnTarget
    } else if combined <= config.near_band_deg {
        AlignmentState::NearTarget
    } else {
        AlignmentState::Searching
    }
}

/// Banded on purpose: there is a gap between the continuous and fast bands
/// rather than a ramp.
pub fn cadence_for(combined_error: f64, config: &GuidanceConfig) -> FeedbackCadence {
    if combined_error <= config.on_target_deg {
        FeedbackCadence::Continuous
    } else if combined_error <= config.fast_band_deg {
        FeedbackCadence::Fast
    } else if combined_error <= config.near_band_deg {
        FeedbackCadence::Slow
    } else {
        FeedbackCadence::Silent
    }
}

/// Compares one reading against a target.
pub fn evaluate(
    reading: &OrientationReading,
    target: &TiltTarget,
    config: &GuidanceConfig,
) -> GuidanceUpdate {
    // positive pitch lowers the panel
    let panel_tilt = (-reading.pitch).clamp(-90.0, 90.0);
    let tilt_discrepancy = panel_tilt - target.angle();
    let azimuth_discrepancy = signed_angle_difference(reading.azimuth, target.azimuth());
    let combined_error = tilt_discrepancy.abs().max(azimuth_discrepancy.abs());

    let hint = if tilt_discrepancy < -config.hint_deg {
        TiltHint::LiftUp
    } else if tilt_discrepancy > config.hint_deg {
        TiltHint::TiltDown
    } else {
        TiltHint::Hold
    };
    let scale = config.bubble_full_scale_deg;

    GuidanceUpdate {
        state: classify(tilt_discrepancy, azimuth_discrepancy, reading.roll, config),
        target: *target,
        panel_tilt,
        tilt_discrepancy,
        azimuth_discrepancy,
        combined_error,
        is_vertical: reading.roll.abs() <= config.vertical_roll_deg,
        hint,
        bubble: (
            (azimuth_discrepancy / scale).clamp(-1.0, 1.0),
            (tilt_discrepancy / scale).clamp(-1.0, 1.0),
        ),
        cadence: cadence_for(combined_error, config),
    }
}

/// Holds the active target and turns orientation readings into guidance.
///
/// The target is published through a `watch` channel: ticks always read a
/// whole target, and a refresh swaps it in one step once the remote lookup
/// resolves. Only the newest refresh may publish.
pub struct AlignmentGuidanceEngine {
    cache: Arc<RemoteEstimateCache>,
    config: GuidanceConfig,
    target: watch::Sender<Option<TiltTarget>>,
    combined_error: watch::Sender<Option<f64>>,
    generation: AtomicU64,
    /// 0 before the first tick, else `state_code`
    last_state: AtomicU8,
    /// `None` follows the host's local zone
    utc_offset: Option<FixedOffset>,
}

fn state_code(state: AlignmentState) -> u8 {
    match state {
        AlignmentState::Searching => 1,
        AlignmentState::NearTarget => 2,
        AlignmentState::OnTarget => 3,
    }
}

impl AlignmentGuidanceEngine {
    pub fn new(cache: Arc<RemoteEstimateCache>, config: GuidanceConfig) -> Self {
        Self {
            cache,
            config,
            target: watch::channel(None).0,
            combined_error: watch::channel(None).0,
            generation: AtomicU64::new(0),
            last_state: AtomicU8::new(0),
            utc_offset: None,
        }
    }

    /// Pins the zone that decides the calendar day for Daily and
    /// Next-30-Days targets.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }

    pub fn config(&self) -> &GuidanceConfig {
        &self.config
    }

    pub fn current_target(&self) -> Option<TiltTarget> {
        *self.target.borrow()
    }

    pub fn subscribe_target(&self) -> watch::Receiver<Option<TiltTarget>> {
        self.target.subscribe()
    }

    /// Combined error of each tick, `None` while there is no target. Feed
    /// this to [`run_feedback`].
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<f64>> {
        self.combined_error.subscribe()
    }

    /// Recomputes the target for a location and mode.
    ///
    /// An unknown location clears the target. Fixed mode consults the remote
    /// cache; until it answers the previous target stays in place, or the
    /// local estimate when there is none for this mode.
    pub async fn refresh_target(&self, location: Option<GeoPoint>, mode: AngleMode) -> Option<TiltTarget> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(location) = location else {
            debug!("location unknown, clearing target");
            self.publish(generation, None);
            return None;
        };

        let local = self.local_target_now(location, mode);
        if mode != AngleMode::Fixed {
            self.publish(generation, Some(local));
            return Some(local);
        }

        let keep_previous = self
            .current_target()
            .is_some_and(|t| t.mode == mode);
        if !keep_previous {
            self.publish(generation, Some(local));
        }

        let target = match self.cache.optimal_tilt_with_freshness(location).await {
            Some(remote) => {
                let source = match remote.freshness {
                    Freshness::Fetched | Freshness::Reused => TargetSource::Remote,
                    Freshness::Fallback => {
                        debug!(fetched_at = %remote.fetched_at, "using stale remote angle");
                        TargetSource::Local
                    }
                };
                TiltTarget::new(remote.angle, source, mode, remote.fetched_at, location)
            }
            None => local,
        };
        self.publish(generation, Some(target));
        Some(target)
    }

    /// Loads settings, resolves the location and refreshes the target.
    pub async fn refresh_from_settings(
        &self,
        store: &dyn KeyValueStore,
        source: &dyn LocationSource,
    ) -> Option<TiltTarget> {
        let settings = GuidanceSettings::load(store);
        let location = resolve_location(&settings, source).await;
        self.refresh_target(location, settings.angle_mode).await
    }

    /// Runs [`Self::refresh_target`] on the tokio runtime so sensor
    /// handling never waits on the network.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        location: Option<GeoPoint>,
        mode: AngleMode,
    ) -> JoinHandle<Option<TiltTarget>> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.refresh_target(location, mode).await })
    }

    /// Evaluates a reading against the current target. `None` while no
    /// target is available.
    pub fn tick(&self, reading: &OrientationReading) -> Option<GuidanceUpdate> {
        let Some(target) = self.current_target() else {
            self.combined_error.send_replace(None);
            return None;
        };
        let update = evaluate(reading, &target, &self.config);
        self.combined_error.send_replace(Some(update.combined_error));

        let code = state_code(update.state);
        if self.last_state.swap(code, Ordering::Relaxed) != code {
            info!(
                state = ?update.state,
                tilt = update.tilt_discrepancy,
                azimuth = update.azimuth_discrepancy,
                "alignment state changed"
            );
        }
        Some(update)
    }

    fn local_target_now(&self, location: GeoPoint, mode: AngleMode) -> TiltTarget {
        let now = self.cache.clock().now();
        match self.utc_offset {
            Some(offset) => local_target(location, mode, &now.with_timezone(&offset), &self.config),
            None => local_target(location, mode, &now.with_timezone(&Local), &self.config),
        }
    }

    /// Swaps in `target` unless a newer refresh has started. The generation
    /// is compared under the channel's write lock.
    fn publish(&self, generation: u64, target: Option<TiltTarget>) {
        let published = self.target.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = target;
            true
        });
        if published {
            debug!(angle = target.map(|t| t.angle()), source = ?target.map(|t| t.source), "target updated");
        } else {
            debug!("superseded refresh, dropping target");
        }
    }
}

/// Haptic or audio output driven by [`run_feedback`].
pub trait FeedbackSink: Send + Sync {
    /// Start a pulse of the given length; must not block.
    fn pulse(&self, duration: Duration);
}

/// Drives `sink` at the cadence for the latest combined error until the
/// error sender is dropped.
pub async fn run_feedback(
    mut errors: watch::Receiver<Option<f64>>,
    sink: Arc<dyn FeedbackSink>,
    config: GuidanceConfig,
) {
    loop {
        let error = *errors.borrow_and_update();
        let cadence = error.map_or(FeedbackCadence::Silent, |e| cadence_for(e, &config));
        if let Some(pulse) = cadence.pulse() {
            sink.pulse(pulse);
        }
        tokio::time::sleep(cadence.interval()).await;
        if errors.has_changed().is_err() {
            debug!("error channel closed, feedback stopped");
            return;
        }
    }
}
