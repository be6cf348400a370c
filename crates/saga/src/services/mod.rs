//! Clients for the resource owner service.

pub mod http;
pub mod in_memory;
pub mod resource_owner;

pub use http::HttpResourceOwnerClient;
pub use in_memory::{InMemoryResourceOwner, RecordedCall};
pub use resource_owner::ResourceOwnerClient;
