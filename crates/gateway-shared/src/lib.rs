//! # Gateway Shared
//!
//! Wire types returned by the gateway's HTTP surface.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
