//! Geographer: turns Sanity content webhooks into cache-tag invalidations
//! and serves the tag-addressable content cache those tags index.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
