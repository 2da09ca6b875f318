// Core session module - request validation and background dispatch.

pub mod session_service;

pub use session_service::*;
