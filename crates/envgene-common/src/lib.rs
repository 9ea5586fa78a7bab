//! General types and utilities for the EnvGene artifact tooling, including
//! registry definitions, application coordinates, credentials and Maven
//! repository layout helpers.

pub use application::*;
pub use auth::*;
pub use credentials::*;
pub use error::CommonError;
pub use maven::*;
pub use registry::*;

mod application;
mod auth;
mod credentials;
mod error;
mod maven;
mod registry;
