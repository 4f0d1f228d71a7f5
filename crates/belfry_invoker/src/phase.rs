//! Invocation lifecycle phases.

use std::fmt;

/// Where one invocation currently stands.
///
/// Phases advance strictly forward; each transition is traced so an
/// operator can tell from logs alone where an invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokePhase {
    /// Request fields are being checked; no sandbox exists yet.
    Validating,
    /// A sandbox has been provisioned under the configured limits.
    SandboxAcquired,
    /// All capability shims installed and the global scope sealed.
    BridgeInstalled,
    /// The bundle artifact was retrieved from the store.
    BundleLoaded,
    /// The bundle's top-level code ran to completion.
    BundleExecuted,
    /// The named export was called and its value settled.
    FunctionInvoked,
    /// Terminal: a result was produced.
    Succeeded,
    /// Terminal: the invocation failed.
    Failed,
    /// Terminal: the deadline fired first.
    TimedOut,
    /// The sandbox has been torn down (always reached).
    Released,
}

impl InvokePhase {
    /// Whether this phase ends the pipeline (release still follows).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }

    /// Stable name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::SandboxAcquired => "sandbox_acquired",
            Self::BridgeInstalled => "bridge_installed",
            Self::BundleLoaded => "bundle_loaded",
            Self::BundleExecuted => "bundle_executed",
            Self::FunctionInvoked => "function_invoked",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Released => "released",
        }
    }
}

impl fmt::Display for InvokePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(InvokePhase::Succeeded.is_terminal());
        assert!(InvokePhase::Failed.is_terminal());
        assert!(InvokePhase::TimedOut.is_terminal());
        assert!(!InvokePhase::BundleLoaded.is_terminal());
        assert!(!InvokePhase::Released.is_terminal());
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(InvokePhase::SandboxAcquired.to_string(), "sandbox_acquired");
        assert_eq!(InvokePhase::Released.to_string(), "released");
    }
}
