//! Long-running mode: wallet supervision, regular backups, shutdown.

pub mod scheduler;
pub mod shutdown;

pub use scheduler::start_regular_backups;
pub use shutdown::ShutdownCoordinator;
