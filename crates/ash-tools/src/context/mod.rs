//! Ambient context attached to heartbeats: local time, music, weather.
//!
//! Every provider is optional. A provider that is not configured, or that
//! fails, simply contributes nothing.

pub mod spotify;
pub mod weather;

pub use spotify::{NowPlaying, SpotifyClient, SpotifyConfig};
pub use weather::{Weather, WeatherClient, WeatherConfig};
