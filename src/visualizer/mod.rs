// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Overlay styling and presentation.

/// Color definitions and palettes.
pub mod color;

/// Body skeleton edge list.
pub mod skeleton;

#[cfg(feature = "visualize")]
pub mod viewer;

pub use color::Color;
pub use skeleton::SKELETON;

#[cfg(feature = "visualize")]
pub use viewer::Viewer;
