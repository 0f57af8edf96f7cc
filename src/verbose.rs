use std::sync::OnceLock;

/// Environment variable gating the verbose bind/signing trace.
pub(crate) const ENV_VAR: &str = "TLS_OFFLOAD_LOGGING";

/// Whether verbose tracing is on.
///
/// Presence of the variable enables the trace regardless of its value; an
/// empty value still enables it. This matches deployed behavior of the
/// toggle, surprising as it is. Checked once per process.
pub(crate) fn enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| std::env::var_os(ENV_VAR).is_some())
}
