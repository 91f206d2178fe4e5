//! Wrist overlay library: a wrist-mounted VR control panel driven by a
//! tracked pointer.
//!
//! The library exposes the tick pipeline and its collaborators for
//! integration testing. The binary entry point lives in `main.rs`.

pub mod agenda;
pub mod backend;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod inbox;
pub mod input_source;
pub mod runtime;
pub mod snapshot;
pub mod state;
pub mod views;
pub mod vr;
pub mod workers;
