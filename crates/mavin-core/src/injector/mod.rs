pub mod backup;
pub mod copier;
pub mod dry_run;
pub mod engine;
pub mod hosts;
pub mod paths;

pub use engine::{InjectEngine, InjectJob, InjectOutcome};
