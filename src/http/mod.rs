//! HTTP types for the admin surface.

mod request;
mod response;

pub use request::{AdminRequest, Method};
pub use response::{AdminResponse, StatusCode};
