// GitHub API module.
// Provides the client, the blame query, and types for the GraphQL and REST APIs.

#![allow(dead_code)]

pub mod blame;
pub mod client;
pub mod endpoints;
pub mod types;

pub use blame::{BlameQuery, BlameSource};
pub use client::GitHubClient;
pub use types::*;
