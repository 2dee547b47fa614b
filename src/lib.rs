//! Storefront page generation: prompt assembly, model completion, output
//! normalization, sandbox previews, saved pages and project export.

pub mod api;
pub mod apply;
pub mod cli;
pub mod config;
pub mod errors;
pub mod export;
pub mod normalize;
pub mod preview;
pub mod prompt;
pub mod provider;
pub mod session;
pub mod store;
pub mod transcript;
pub mod ux;
pub mod wire;

pub use errors::ForgeError;
