//! Job identity, configuration and discovery types.

mod class;
mod config;
mod context;
mod descriptor;
mod key;

pub use class::{IntoJobResult, JobClass, JobMethod, MethodFn};
pub use config::{JobConfig, DEFAULT_GROUP};
pub use context::{FireKind, JobContext};
pub use descriptor::{BoundMethod, DeclaringType, JobDescriptor, JobInstance};
pub use key::{JobKey, TriggerKey};
