pub mod streamer;
pub mod warmer;

pub use streamer::PriceStreamer;
pub use warmer::CacheWarmer;
