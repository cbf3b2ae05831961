//! Adapters layer (Hexagonal Architecture)

mod channel_publisher;
mod static_source;

pub use channel_publisher::ChannelBlockPublisher;
pub use static_source::StaticProducerListSource;
