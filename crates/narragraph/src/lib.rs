//! Narragraph - turns narrated text into diagrams.
//!
//! A transcript segment goes through structure extraction, relationship
//! validation and layout, with a semantic cache in front of the expensive
//! stages. Every stage degrades instead of failing, so each segment always
//! yields a renderable, overlap-free [`LayoutData`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use narragraph::{
//!     CancellationToken, Pipeline, Segment,
//!     cache::SemanticCache,
//!     config::AppConfig,
//! };
//!
//! let config = AppConfig::default();
//! let cache = Arc::new(SemanticCache::with_system_clock(config.cache.clone()));
//! let pipeline = Pipeline::new(config, cache, None).expect("valid configuration");
//!
//! let segment = Segment::new("First, collect the data. Then, clean it.", 0, 4_000);
//! let outcome = pipeline.process_segment(&segment, &CancellationToken::new());
//! assert!(outcome.layout.value().find_overlap().is_none());
//! ```

pub mod cache;
pub mod config;
pub mod extract;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod validate;

mod error;
mod stage;

pub use narragraph_core::{analysis, fingerprint, geometry, layout::LayoutData};

pub use error::{ConfigError, ExtractionError, LayoutError, NarragraphError};
pub use model::{CancellationToken, ModelCapability, ModelError, ModelRequest};
pub use pipeline::{CacheStatus, Pipeline, Segment, SegmentOutcome};
pub use stage::{DegradeReason, Stage};
