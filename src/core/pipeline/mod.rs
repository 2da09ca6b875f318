// Core pipeline module - the session coordinator and the ports it drives.

pub mod pipeline_service;

pub use pipeline_service::*;
