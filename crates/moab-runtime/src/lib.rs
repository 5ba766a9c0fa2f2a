//! `moab-runtime` – the real-time run loop.
//!
//! # Modules
//!
//! - [`run_loop`] – [`RunLoop`][run_loop::RunLoop]: resolves a controller,
//!   acquires the status device and environment, resets once and then
//!   cycles invoke → step until stopped.  [`EnvGuard`][run_loop::EnvGuard]
//!   guarantees the environment is closed on every exit path.
//! - [`stop`] – [`StopSignal`][stop::StopSignal]: cooperative cancellation,
//!   raised from a Ctrl-C handler.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with optional OTLP span export.

pub mod run_loop;
pub mod stop;
pub mod telemetry;

pub use run_loop::{EnvGuard, RunConfig, RunLoop, RunReport, StopReason};
pub use stop::StopSignal;
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
