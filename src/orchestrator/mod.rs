//! Setup and teardown sequencing for the data lake resources
//!
//! Both orchestrators run strictly sequentially over the resource
//! clients. Every step is individually skippable via flags; the first
//! failing step aborts the remaining sequence with the step name in the
//! error context. There is no rollback of earlier steps - re-running
//! with the appropriate skip flags is the recovery path.

pub mod setup;
pub mod teardown;

#[cfg(test)]
pub(crate) mod testing;

pub use setup::{run_setup, SetupOptions};
pub use teardown::{run_teardown, TeardownOptions};
