//! Trello tracker client
//!
//! Reads boards, lists, cards, members and card move histories from the
//! Trello REST API. The async [`TrackerClient`] does the HTTP work;
//! [`BlockingTracker`] wraps it for the synchronous report builder and cache
//! sync.
//!
//! ## Usage
//!
//! Configure credentials in `~/.config/boardclock/config.toml`:
//!
//! ```toml
//! [tracker]
//! api_key = "your-api-key"
//! token = "your-token"
//! team_board = "Team"
//! ```
//!
//! or through `BOARDCLOCK_API_KEY` and `BOARDCLOCK_TOKEN`.

mod blocking;
mod client;
pub mod wire;

pub use blocking::{people_from_team_board, BlockingTracker};
pub use client::TrackerClient;
