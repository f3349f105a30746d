pub mod app;
pub mod deployment;
pub mod resource;

pub use app::{AppStatus, Application, DeploymentSummary, ImageRef};
pub use deployment::{AppRef, Deployment, DeploymentStatus};
pub use resource::{Resource, ResourceId, ResourceKey};
