//! Utility modules for the account backup crate.

pub mod errors;
pub mod logger;

pub use errors::{
    AppError, ManagerError, ProcessCoordinationError, RestoreError, Result, ServiceError,
};
