//! Lifecycle State
//!
//! ```text
//! Uninitialized ──initialize──▶ Running ──restart(d>0)──▶ RestartPending
//!                                  │  ╲                        │
//!                                  │   ╲──reset──▶ ResettingDurableStore
//!                                  │                           │
//!                                  └──deep_sleep──▶ ShuttingDownForSleep
//!                                                              │
//!                                             (chip reset / sleep entry)
//! ```
//!
//! There is no way back from the three right-hand states except through a
//! chip reset, which starts a new process in `Uninitialized`.

/// Lifecycle state of the running firmware
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// `initialize` not called yet
    #[default]
    Uninitialized,
    /// Booted and counted
    Running,
    /// A delayed restart is armed
    RestartPending,
    /// The durable store is being wiped
    ResettingDurableStore,
    /// I/O is being shut down before deep sleep
    ShuttingDownForSleep,
}

impl LifecycleState {
    /// Check if `initialize` has completed
    #[must_use]
    pub const fn is_initialized(self) -> bool {
        !matches!(self, Self::Uninitialized)
    }

    /// Check if the firmware is heading for a reset or sleep
    #[must_use]
    pub const fn is_terminating(self) -> bool {
        matches!(
            self,
            Self::RestartPending | Self::ResettingDurableStore | Self::ShuttingDownForSleep
        )
    }

    /// Short name for logs and reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::RestartPending => "restart-pending",
            Self::ResettingDurableStore => "resetting",
            Self::ShuttingDownForSleep => "sleeping",
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LifecycleState {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str());
    }
}
