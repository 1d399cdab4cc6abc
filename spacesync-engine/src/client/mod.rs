//! Remote space access.
//!
//! The engines only speak to the destination through the
//! `SpaceClient`/`ManagementClient` traits; `cma` provides the
//! concrete HTTP implementation for a Content Management API backend.

pub mod cma;
pub mod space;

pub use cma::{CmaClient, CmaConfig};
pub use space::{ListQuery, ManagementClient, SpaceClient};
