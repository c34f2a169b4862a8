//! Observability utilities: subscriber setup and phase timing.

mod logging;
mod timer;

pub use logging::{init_tracing, LogFormat};
pub use timer::StepTimer;
