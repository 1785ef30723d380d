//! Middleware modules.

pub mod admission;
pub mod error;
pub mod key;

pub use admission::AdmissionMiddleware;
