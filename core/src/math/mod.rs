pub mod geo;
pub mod stats;

pub use geo::{haversine_km, GeoPoint, GridLocator};
pub use stats::StatsHelper;
