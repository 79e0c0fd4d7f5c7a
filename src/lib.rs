//! Client-side capture and streaming analysis pipeline for a facial
//! emotion recognition product.
//!
//! Data flows capture source → frame sampler → analysis client → timeline
//! store → chart/overlay consumers. A [`session::SessionController`] gates
//! the sampling cadence and owns teardown; the timeline is the single
//! source of truth for every visualization.

pub mod capture;
pub mod chart;
pub mod client;
pub mod config;
pub mod model;
pub mod overlay;
pub mod recording;
pub mod session;
pub mod timeline;
mod utils;

pub use client::AnalysisClient;
pub use session::SessionController;
