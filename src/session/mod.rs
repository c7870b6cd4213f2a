mod controller;
mod scold;
mod state;

pub use controller::{SessionController, SessionRuntime};
pub use scold::{Scold, Scolder};
pub use state::{ChunkUpdate, SessionState, MAX_HISTORY};
