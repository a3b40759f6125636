//! Domain models for CodeVault.

mod filter;
mod repository;
mod snippet;
mod video;

pub use filter::*;
pub use repository::*;
pub use snippet::*;
pub use video::*;
