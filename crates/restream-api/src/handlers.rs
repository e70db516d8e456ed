//! Request handlers.

pub mod health;
pub mod playback;
pub mod stream;
pub mod streams;

pub use health::*;
pub use playback::*;
pub use stream::*;
pub use streams::*;
