//! CadForge service collaborators
//!
//! Concrete implementations of the `cadforge-core` service contracts: the
//! mock security scanner and converter, and the real HTTP contour client.

pub mod contour;
pub mod converter;
pub mod scanner;

pub use contour::HttpContourService;
pub use converter::MockConverter;
pub use scanner::MockScanner;
