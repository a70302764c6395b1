pub mod cancel;
pub mod config;
pub mod error;
pub mod finder;
pub mod injector;
pub mod progress;

pub use cancel::CancelToken;
pub use config::{AppConfig, HostConfig};
pub use error::Error;
pub use finder::{FindEngine, FindReport, FindRequest};
pub use injector::{InjectEngine, InjectJob, InjectOutcome};
pub use progress::{ProgressReporter, SilentReporter};
