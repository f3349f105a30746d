pub mod deploy;
pub mod navigation;

pub use deploy::{ActionPhase, DeployOutcome, DeployTrigger};
pub use navigation::{Navigator, Route};
