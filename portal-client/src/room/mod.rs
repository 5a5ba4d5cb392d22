mod join_params;
mod room_session;

pub use join_params::*;
pub use room_session::*;
