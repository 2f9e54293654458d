//! Process-lifetime caches used during registration.
//!
//! Both caches only grow. Their key spaces are bounded by the job classes
//! and namespaces compiled into the program, so nothing is ever evicted.

mod instance;
mod scan;

pub use instance::InstanceCache;
pub use scan::ScanCache;
