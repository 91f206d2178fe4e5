//! Spatial side of the overlay: poses, panels, hit-testing, click edges,
//! render caching and the texture sink.

pub mod click;
pub mod pose;
pub mod raster;
pub mod render_cache;
pub mod scene;
pub mod texture;
