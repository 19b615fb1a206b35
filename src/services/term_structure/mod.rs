//! 期货期限结构

mod builder;
mod error;
mod exclusion;
mod render;
mod table;
mod window;

pub use builder::{RenderTarget, TermStructureArtifact, TermStructureBuilder};
pub use error::TermStructureError;
pub use exclusion::ContinuousContracts;
