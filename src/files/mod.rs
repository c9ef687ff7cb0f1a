//! # Archivos Estáticos
//! src/files/mod.rs
//!
//! Resolución de URIs contra el document root y tabla de Content-Type.
//!
//! ```text
//! Request → DocumentRoot::resolve → Response (200 / 403 / 404 / 500)
//! ```

pub mod mime;
pub mod resolver;

pub use mime::content_type_for;
pub use resolver::{build_response, DocumentRoot};
