//! Upstream receiver feed: transport, supervision and synthetic fallback

mod fallback;
mod supervisor;
mod transport;

pub use fallback::{FallbackSettings, SyntheticFallback};
pub use supervisor::{ConnectionState, FeedSupervisor, SupervisorSettings};
pub use transport::{connect, ReadEvent, ReceiverConnection};
