//! # Prometheus Stream Listener
//!
//! A declarative polling-consumer scheduler.
//!
//! Application code registers *endpoints*: a data provider that pulls batches
//! of records from some source, a listener that handles them (one record at a
//! time or a whole batch), and optional filter, error-handler and converter
//! hooks. The publisher drives every endpoint through repeated
//! poll-and-process cycles:
//!
//! ```text
//! receive -> filter -> invoke -> per-record status -> commit
//! ```
//!
//! Each cycle commits exactly one status (`OK`, `ERROR` or `SKIPPED`) per
//! received record, whatever the listener does, and at most one cycle per
//! endpoint runs at any instant.
//!
//! ## Scheduling
//!
//! - **Continuous** endpoints (`auto_startup`) are driven in a loop that
//!   sleeps a fixed delay between cycles and stops once the source runs dry
//!   ([`core::IdlePolicy::Drain`]) or keeps polling ([`core::IdlePolicy::Poll`]).
//! - **Timer** endpoints fire on a cron expression; a tick that found records
//!   re-arms on the fixed delay until the source is drained.
//! - With cron disabled (`-`) the endpoint runs on a fixed-delay timer.
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_stream_listener::builders::{build_publisher, EndpointBuilder};
//! use prometheus_stream_listener::config::StreamListenerConfig;
//!
//! let config = StreamListenerConfig::from_env()?;
//! let runtime = build_publisher(&config)?;
//!
//! let endpoint = EndpointBuilder::new("orderListener")
//!     .topic("orders")
//!     .auto_startup(true)
//!     .record_listener(OrderListener)
//!     .data_provider(provider)
//!     .build(&config)?;
//!
//! runtime.publisher().register(endpoint)?;
//! runtime.publisher().startup();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core listener abstractions, cycle execution and scheduling.
pub mod core;
/// Configuration models for the listener process and its endpoints.
pub mod config;
/// Builders to construct endpoints and publishers from configuration.
pub mod builders;
/// Runtime adapters and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
