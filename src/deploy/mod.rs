/*
* Deployment artifacts and compose tooling for the managed applications.
*/

pub mod compose;
pub mod dockerfile;
pub mod error;
pub mod orchestrator;
pub mod runner;

pub use compose::{ComposeFile, ComposeMode, ComposeService};
pub use dockerfile::DockerfileSpec;
pub use error::DeployError;
pub use orchestrator::Orchestrator;
pub use runner::{CommandOutput, ComposeCli, ComposeRunner};
