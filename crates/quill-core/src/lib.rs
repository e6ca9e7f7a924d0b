//! # Quill Core
//!
//! The domain layer of the Quill blogging service: records, form validation,
//! pagination, the ports infrastructure must implement and the services the
//! HTTP layer calls. No infrastructure dependencies live here.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;
pub mod services;

pub use error::{DomainError, RepoError};
