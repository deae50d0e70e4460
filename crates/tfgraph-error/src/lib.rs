//! # tfgraph-error
//!
//! Unified error handling for the tfgraph engine.
//!
//! ## Design
//!
//! - **ErrorKind**: what went wrong (e.g. MissingResource, ConfigInvalid)
//! - **Operation**: where it was raised, plus the operations it passed through
//! - **Context**: key/value pairs that locate the cause (provider, handler, node key)
//! - **Source**: the wrapped underlying error, never leaked as a raw type
//!
//! ## Usage
//!
//! ```rust
//! use tfgraph_error::{Error, ErrorKind};
//!
//! fn group() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::MissingResource, "no aws_vpc to group under")
//!         .with_operation("aws::group_vpc_endpoints")
//!         .with_context("child_type", "aws_vpc_endpoint"))
//! }
//! ```
//!
//! ## Recovery policy
//!
//! The pipeline orchestrator decides what to do with an error by looking at its kind:
//! [`ErrorKind::is_recoverable`] errors skip a single handler, everything else aborts the
//! run for the affected provider. The engine never terminates the process.

mod error;
mod kind;

pub use error::Error;
pub use kind::ErrorKind;

/// Result type alias using the tfgraph Error
pub type Result<T> = std::result::Result<T, Error>;
