//! Caravel Docker Image Build functionality
//!
//! This crate provides Docker image build capabilities for Caravel,
//! including Dockerfile resolution, build context creation, and image
//! building from local directories or remote git repositories.

pub mod builder;
pub mod context;
pub mod error;
pub mod progress;
pub mod resolver;

pub use builder::ImageBuilder;
pub use context::ContextBuilder;
pub use error::{BuildError, BuildResult};
pub use progress::BuildProgress;
pub use resolver::BuildResolver;
