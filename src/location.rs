use async_trait::async_trait;
use tracing::{debug, warn};

use crate::store::GuidanceSettings;
use crate::types::GeoPoint;

/// Device positioning, supplied by the host. `None` means the location is
/// unknown (no fix, no permission).
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_location(&self) -> Option<GeoPoint>;
}

/// A source that always reports the same point, or nothing.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Option<GeoPoint>);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_location(&self) -> Option<GeoPoint> {
        self.0
    }
}

/// Picks the manual coordinates or the device source per the settings.
pub async fn resolve_location(
    settings: &GuidanceSettings,
    source: &dyn LocationSource,
) -> Option<GeoPoint> {
    if settings.use_gps {
        let loc = source.current_location().await;
        debug!(?loc, "location from device source");
        return loc;
    }
    match GeoPoint::new(settings.manual_latitude, settings.manual_longitude) {
        Ok(loc) => Some(loc),
        Err(e) => {
            warn!(error = %e, "manual coordinates rejected");
            None
        }
    }
}
