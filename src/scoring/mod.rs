pub mod correction;
pub mod emotion;

pub use correction::{apply_correction, max_allowed_score, Correction};
pub use emotion::{describe_bands, display_emotion, oracle_band};
