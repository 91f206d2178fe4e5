//! Backends hosting the overlay tick. Only the headless backend ships; a
//! runtime-backed sink plugs in through `TextureSink`.

pub mod headless;

pub use headless::{run, HeadlessConfig};
