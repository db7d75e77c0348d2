pub mod activity;
pub mod autocomplete;
pub mod buttons;
pub mod commands;
pub mod error;
pub mod locks;
pub mod options;
pub mod parse;
pub mod permissions;
pub mod reconciler;
pub mod registration;
pub mod replies;
pub mod roster;
pub mod router;
pub mod seatmap;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, AppStateInner, BotConfig};
