//! Infrastructure layer - storage and clock adapters.
//!
//! This layer provides the concrete implementations of the application
//! ports:
//! - Clock adapters (system time vs mock)
//! - Storage backends (in-memory, Redis)
//! - The URI-based storage factory

pub mod clock;
pub mod factory;
pub mod memory;
pub mod mocks;

#[cfg(feature = "redis")]
pub mod redis;
