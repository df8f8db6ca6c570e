use dc_core::config::{trace_ir_mode, verify_mode};
use serde::{Deserialize, Serialize};

/// Per-call emission settings. Defaults come from the environment flags in
/// [`dc_core::config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitOptions {
    /// Run the IR verifier over the enclosing function after emission.
    pub verify: bool,
    /// Log the enclosing function at debug level after emission.
    pub trace_ir: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            verify: verify_mode(),
            trace_ir: trace_ir_mode(),
        }
    }
}

impl EmitOptions {
    pub fn verified() -> Self {
        Self {
            verify: true,
            ..Self::default()
        }
    }
}
