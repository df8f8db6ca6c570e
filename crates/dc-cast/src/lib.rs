// dc-cast: static feasibility of dynamic casts and emission of casts that
// are proven to succeed.
//
// Architecture:
// - feasibility: three-valued classification over the type algebra
// - emitter: recursive emission over source/target descriptors
// - unconditional: validated entry points used by code generation

pub mod config;
pub mod emitter;
pub mod error;
pub mod feasibility;
pub mod unconditional;

// Re-export key types for convenience
pub use config::EmitOptions;
pub use emitter::{CastConsumptionKind, CastEmitter, Source, Target};
pub use error::CastError;
pub use feasibility::{classify_dynamic_cast, Feasibility};
pub use unconditional::{
    emit_successful_indirect_unconditional_cast, emit_successful_scalar_unconditional_cast,
    UnconditionalCast,
};
