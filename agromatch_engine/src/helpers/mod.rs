mod geo;

pub use geo::{deg_to_rad, haversine_meters, meters_to_km};
