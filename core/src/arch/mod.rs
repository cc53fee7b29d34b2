//! Architecture-specific execution context.
//!
//! The rest of the crate treats [`ExecutionContext`] as opaque and only
//! ever asks for one through [`build_context`].

pub mod x86_64;

pub use self::x86_64::{build_context, ExecutionContext};
