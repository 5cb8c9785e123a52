mod config;
mod patterns;

pub use config::TraceGenConfig;
pub use patterns::{summarize, TraceGenerator, TraceSummary};
