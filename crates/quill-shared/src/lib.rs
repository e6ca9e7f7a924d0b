//! # Quill Shared
//!
//! Wire types shared by the server and its clients: the response envelope,
//! RFC 7807 error bodies and request/response DTOs.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
