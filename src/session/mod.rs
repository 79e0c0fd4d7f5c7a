mod controller;
mod loop_worker;
mod state;

pub use controller::SessionController;
pub use state::{CurrentDisplay, SessionState, SessionStatus};
