pub mod cache;
pub mod client;
pub mod config;
pub mod dissect;
pub mod error;
pub mod models;
pub mod monitor;
pub mod parser;
pub mod reasons;
pub mod render;
pub mod source;

pub use cache::{CacheStatus, EndpointCache, IdentityLookup, Resolution};
pub use client::AgentClient;
pub use dissect::{Dissector, PacketDissector};
pub use error::{DecodeError, LookupError};
pub use models::domain::{Addressing, Endpoint, SecurityIdentity};
pub use parser::{DropRecord, DROP_NOTIFY_LEN};
pub use reasons::reason_text;
pub use render::{render_summary, Renderer};
