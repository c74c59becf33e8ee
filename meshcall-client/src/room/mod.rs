mod mesh_command;
mod mesh_handle;
mod orchestrator;

pub(crate) use mesh_command::*;
pub use mesh_handle::*;
pub use orchestrator::*;
