//! End-of-session reduction: deterministic numbers first, narrative second.

pub mod compiler;
pub mod metrics;
pub mod template;

pub use compiler::{compile_report, FinalReport};
pub use metrics::{classify_trend, grade_for, ReportMetrics, Trend};
