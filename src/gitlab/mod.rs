pub mod client;
#[cfg(test)]
pub mod fixtures;
pub mod links;
pub mod types;

pub use client::GitLabClient;
