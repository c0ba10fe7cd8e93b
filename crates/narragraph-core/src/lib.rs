//! Narragraph Core Types and Definitions
//!
//! This crate provides the value types shared by every stage of the
//! Narragraph pipeline. It includes:
//!
//! - **Geometry**: Points, sizes, bounding boxes and insets ([`geometry`] module)
//! - **Analysis**: The typed graph extracted from text ([`analysis`] module)
//! - **Fingerprint**: Compact content summaries used for caching ([`fingerprint`] module)
//! - **Layout**: Positioned scene graphs handed to renderers ([`layout`] module)

pub mod analysis;
pub mod fingerprint;
pub mod geometry;
pub mod layout;
