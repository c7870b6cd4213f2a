mod chunk;
mod pause;
mod sample;
mod session;
mod stats;

pub use chunk::ChunkSummary;
pub use pause::PausePeriod;
pub use sample::Sample;
pub use session::{Emotion, HistoryEntry, SessionMemory, SessionStatus};
pub use stats::{AppCount, AppTime, SessionStats};
