pub mod controller;
pub mod host;
pub mod next_up;
pub mod session;

pub use controller::{PlayerCommand, PlayerController, PlayerHandle};
pub use host::{PlaybackHost, WindowTarget};
pub use next_up::{Lookahead, NextEpisodePrefetcher, NextUpSlot};
pub use session::PlaybackSession;
