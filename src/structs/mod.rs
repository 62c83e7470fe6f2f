pub mod key;
pub mod observations;
pub mod params;
