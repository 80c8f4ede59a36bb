//! CadForge - Core Library
//!
//! Types, validators, the file registry, and the upload-session state
//! machine for tracking CAD files from upload through security scanning to
//! conversion or contour extraction.

pub mod config;
pub mod error;
pub mod registry;
pub mod service;
pub mod session;
pub mod types;
pub mod validate;

pub use config::*;
pub use error::*;
pub use registry::*;
pub use service::*;
pub use session::*;
pub use types::*;
