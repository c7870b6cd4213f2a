pub mod activity;
pub mod classifier;
pub mod controller;
pub mod input;
pub mod loop_worker;
pub mod window_source;

pub use activity::{ActivitySnapshot, ActivityTracker, PauseTransition};
pub use classifier::{AppCategory, AppClassifier};
pub use controller::SensingController;
pub use input::{IdleProbeSource, InputEvent, InputKind, InputSender, InputSource};
pub use loop_worker::ObserverConfig;
pub use window_source::{CommandWindowSource, ObserverError, WindowSource};
