//! Platform layer
//!
//! Browser-only drawing surface. Native builds render through
//! `renderer::SvgSurface` and store through `persistence::FileStore`.

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WebSurface;
