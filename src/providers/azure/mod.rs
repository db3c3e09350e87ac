pub mod client;
pub mod links;
pub mod provider;
pub mod types;

pub use client::{AzureDevOpsClient, HttpSettings};
pub use provider::{AzureProvider, CollectOptions};
