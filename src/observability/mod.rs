//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Mutation handlers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (mutation and persistence counters)
//!
//! Consumers:
//!     → stdout (fmt layer, filter from config or RUST_LOG)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
