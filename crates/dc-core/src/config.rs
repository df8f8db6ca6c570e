use std::sync::OnceLock;

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| {
        let trimmed = val.trim();
        !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
    })
}

fn bool_from_env(key: &str) -> bool {
    env_true(key).unwrap_or(false)
}

/// Run the IR verifier after every cast emission.
pub fn verify_mode() -> bool {
    static VERIFY: OnceLock<bool> = OnceLock::new();
    *VERIFY.get_or_init(|| bool_from_env("DYNCAST_VERIFY"))
}

/// Log the pretty-printed function after every cast emission.
pub fn trace_ir_mode() -> bool {
    static TRACE_IR: OnceLock<bool> = OnceLock::new();
    *TRACE_IR.get_or_init(|| bool_from_env("DYNCAST_TRACE_IR"))
}
