//! Builders to construct listener components from configuration.

pub mod endpoint_builder;

pub use endpoint_builder::{build_publisher, build_publisher_on, EndpointBuilder};
