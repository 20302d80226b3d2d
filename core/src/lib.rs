//! Root of the `domtrace-core` library: capture pipeline, masking, storage
//! and the session lifecycle.

// Library code reports through `tracing`; only the binaries print.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod analyzer;
mod capture;
pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod masking;
pub mod normalizer;
pub mod registry;
pub mod service;
pub mod store;
mod time;

pub use analyzer::RecordingSummary;
pub use analyzer::analyze;
pub use capture::CaptureSink;
pub use config::Config;
pub use config::ConfigOverrides;
pub use controller::BrowserDriver;
pub use controller::DriverFactory;
pub use controller::SessionController;
pub use controller::StopOutcome;
pub use detector::SensitiveFieldDetector;
pub use error::RecorderError;
pub use error::Result;
pub use masking::MaskingEngine;
pub use normalizer::CaptureSignal;
pub use normalizer::EventNormalizer;
pub use registry::SessionRegistry;
pub use service::RecorderService;
pub use store::SessionStore;
