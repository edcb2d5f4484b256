use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use solar_alignment::angles::{seasonal_tilts, sun_position_at};
use solar_alignment::clock::SystemClock;
use solar_alignment::config::EngineConfig;
use solar_alignment::guidance::{run_feedback, AlignmentGuidanceEngine, FeedbackSink};
use solar_alignment::location::FixedLocation;
use solar_alignment::orientation::OrientationEstimator;
use solar_alignment::remote::{PvgisProvider, RemoteEstimateCache};
use solar_alignment::series::monthly_series;
use solar_alignment::store::{GuidanceSettings, MemoryStore};
use solar_alignment::types::{AngleMode, GeoPoint, OrientationSample};

struct PrintSink;

impl FeedbackSink for PrintSink {
    fn pulse(&self, duration: Duration) {
        println!("  * pulse {} ms", duration.as_millis());
    }
}

/// Device held upright facing south, raised `tilt` degrees.
fn sweep_samples(tilt: f64, t: Duration) -> [OrientationSample; 2] {
    let g = 9.81;
    let r = tilt.to_radians();
    let (s, c) = r.sin_cos();
    // north is (0, -c, s) in device axes, down is (0, -s, -c)
    [
        OrientationSample::accelerometer([0.0, g * s, g * c], t),
        OrientationSample::magnetometer([0.0, -22.0 * c - 40.0 * s, 22.0 * s - 40.0 * c], t),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::default();
    let latitude = -33.9;
    let longitude = 151.2;
    let here = GeoPoint::new(latitude, longitude)?;

    println!("=== Solar Alignment Example ===");
    println!("Location: Sydney ({:.1}°S, {:.1}°E)", -latitude, longitude);

    let pos = sun_position_at(latitude, longitude, &Utc::now());
    println!("Sun altitude {:.2}°, azimuth {:.2}°", pos.altitude, pos.azimuth);

    let seasonal = seasonal_tilts(latitude);
    println!();
    println!("--- Seasonal Tilts ---");
    println!("Summer: {:.1}°", seasonal.summer);
    println!("Spring/Fall: {:.1}°", seasonal.spring_fall);
    println!("Winter: {:.1}°", seasonal.winter);
    println!("Year-round: {:.1}°", seasonal.year_round);

    println!();
    println!("--- Monthly Tilts ---");
    for m in monthly_series(latitude) {
        println!("{:>2}: {:5.1}°  {:?}", m.month, m.angle, m.note);
    }

    let store = Arc::new(MemoryStore::new());
    GuidanceSettings {
        use_gps: false,
        manual_latitude: latitude,
        manual_longitude: longitude,
        angle_mode: AngleMode::Fixed,
    }
    .save(store.as_ref());

    let provider = Arc::new(PvgisProvider::new(config.cache.clone())?);
    let cache = Arc::new(RemoteEstimateCache::new(
        provider,
        store.clone(),
        Arc::new(SystemClock),
        config.cache.clone(),
    ));
    let engine = Arc::new(AlignmentGuidanceEngine::new(cache.clone(), config.guidance));

    println!();
    println!("--- Target ---");
    let target = engine
        .refresh_from_settings(store.as_ref(), &FixedLocation(None))
        .await
        .ok_or("no target")?;
    println!(
        "Tilt {:.1}° facing {:.0}° ({:?})",
        target.angle(),
        target.azimuth(),
        target.source
    );
    let output = cache.estimate_output(here, 400, 10, 0.2).await;
    println!("Expected output: {:.1} kWh/day, {:.0} kWh/year", output.daily, output.yearly);

    let feedback = tokio::spawn(run_feedback(
        engine.subscribe_errors(),
        Arc::new(PrintSink),
        config.guidance,
    ));

    let estimator = Arc::new(OrientationEstimator::new(config.estimator));
    let (sample_tx, sample_rx) = mpsc::channel(64);
    let (reading_tx, mut reading_rx) = mpsc::channel(64);
    let fusion = {
        let estimator = estimator.clone();
        tokio::spawn(async move { estimator.run(sample_rx, reading_tx).await })
    };

    let sweep = tokio::spawn(async move {
        let start = tokio::time::Instant::now();
        for step in 0..=30 {
            let tilt = step as f64 * 2.0;
            for sample in sweep_samples(tilt, start.elapsed()) {
                if sample_tx.send(sample).await.is_err() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    });

    println!();
    println!("--- Sweep ---");
    while let Some(reading) = reading_rx.recv().await {
        if let Some(update) = engine.tick(&reading) {
            println!(
                "panel {:5.1}°  tilt {:+6.1}°  azimuth {:+6.1}°  {:?} {:?}",
                update.panel_tilt,
                update.tilt_discrepancy,
                update.azimuth_discrepancy,
                update.state,
                update.hint
            );
        }
    }

    sweep.await?;
    fusion.await?;
    drop(engine);
    feedback.await?;
    Ok(())
}
