//! Application services: webhook authentication, tag resolution,
//! revalidation orchestration and the cached content fetch layer.

pub mod auth;
pub mod content;
pub mod error;
pub mod queries;
pub mod repos;
pub mod revalidate;
pub mod tags;
