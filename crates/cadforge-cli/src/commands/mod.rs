pub mod check;
pub mod formats;
pub mod upload;
