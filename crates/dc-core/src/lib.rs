#[macro_use]
pub mod macros;

pub mod config;
pub mod error;
pub mod ir;
pub mod lowering;
pub mod pretty;
pub mod span;
pub mod types;

// Re-export commonly used items for convenience
pub use tracing;

pub use ir::{IrBuilder, IrFunction, IrValue};
pub use lowering::TypeLowering;
pub use types::{LoweredTy, OptionalKind, Symbol, Ty, TyKind, TypeContext, TypeOracle};

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
