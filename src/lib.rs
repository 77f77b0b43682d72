//! Periodica - resumable harvesting of documents from periodical sites.
//!
//! Walks journal -> volume -> issue -> article hierarchies across
//! heterogeneous publisher sites, records per-unit failures for targeted
//! retry, and stores retrieved content deduplicated by SHA-256 digest.

pub mod cli;
pub mod config;
pub mod fetch;
pub mod models;
pub mod repository;
pub mod scrapers;
pub mod services;
pub mod storage;
pub mod traversal;
