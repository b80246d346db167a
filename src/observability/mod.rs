//! Logging and optional OpenTelemetry trace export.
//!
//! Library code only emits `tracing` spans and events; nothing is printed until
//! a binary installs a subscriber with [`init_tracing`].
//!
//! # Architecture
//!
//! ```text
//! tracing macros ─┬─> fmt layer ──────────────────────────────> stderr
//!                 └─> tracing-opentelemetry → SDK → FileSpanExporter → JSON lines
//! ```
//!
//! # Modules
//!
//! - `init`: subscriber setup
//! - `tracer`: tracer provider with a file-backed span exporter
//! - `span_formatter`: OTLP JSON encoding of span batches
//! - `file_writer`: size-rotated trace file

mod file_writer;
mod init;
mod span_formatter;
mod tracer;

pub use init::init_tracing;
