//! Ripple midend and backend: the MIR, FIR-to-MIR lowering, the MIR
//! visitor framework and passes, and CUDA-flavored code generation with a
//! host/device split.
//!
//! The pipeline a driver runs:
//!
//! 1. [`lower`] a parsed program into a [`MirContext`] (accumulating
//!    lowering diagnostics),
//! 2. [`resolve_directions`] to fix each edgeset apply's traversal flavor
//!    from the backend configuration,
//! 3. [`generate`] the output source, which aborts on the first structural
//!    inconsistency.

pub mod codegen;
pub mod mir;

pub use codegen::{generate, CodegenError};
pub use mir::context::{BackendConfig, DirectionChoice, MirContext};
pub use mir::direction::resolve_directions;
pub use mir::lower::{lower, LoweringDiagnostic};
