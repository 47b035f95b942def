// SPDX-License-Identifier: GPL-3.0-only

//! Scan pipeline lifecycle states

use std::fmt;

/// Lifecycle of a [`ScanPipeline`](super::ScanPipeline)
///
/// ```text
///  Idle ──start──▶ Initializing ──opened──▶ Running ◀──first frame── Restarting
///   │                   │                     │                          ▲
///   │                   │ no device           └──── failure threshold ───┘
///   ▼                   ▼
///  Stopped ◀────────── stop() from any active state
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineState {
    /// Constructed, never started
    #[default]
    Idle,
    /// Opening the camera
    Initializing,
    /// Capturing and decoding
    Running,
    /// Camera is being re-opened after repeated read failures
    Restarting,
    /// Shut down; only `restart()` leaves this state
    Stopped,
}

impl PipelineState {
    /// Whether worker threads may be alive in this state
    pub fn is_active(self) -> bool {
        matches!(self, Self::Initializing | Self::Running | Self::Restarting)
    }

    /// Whether the automatic transition `self → next` is allowed
    ///
    /// `restart()` may force `Initializing` from any state and is not
    /// checked here.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Initializing)
                | (Initializing, Running)
                | (Running, Restarting)
                | (Restarting, Running)
                | (Idle | Initializing | Running | Restarting, Stopped)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Restarting => "restarting",
            Self::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Coarse status for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanStatus {
    /// Camera is being opened or re-opened
    Initializing,
    /// Running, no code published yet
    Scanning,
    /// A record is being shown
    Detected,
    /// The camera could not be opened
    Error,
    /// Stopped on request
    Stopped,
}

impl ScanStatus {
    pub fn indicator(self) -> &'static str {
        match self {
            Self::Initializing => "⏳",
            Self::Scanning => "🔍",
            Self::Detected => "✅",
            Self::Error => "⚠",
            Self::Stopped => "⏹",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing camera...",
            Self::Scanning => "Scanning for QR code...",
            Self::Detected => "Product detected",
            Self::Error => "Camera error",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.indicator(), self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(Idle.can_transition_to(Initializing));
        assert!(Initializing.can_transition_to(Running));
        assert!(Running.can_transition_to(Restarting));
        assert!(Restarting.can_transition_to(Running));
        for state in [Idle, Initializing, Running, Restarting] {
            assert!(state.can_transition_to(Stopped));
        }
    }

    #[test]
    fn test_stopped_is_terminal() {
        for next in [Idle, Initializing, Running, Restarting, Stopped] {
            assert!(!Stopped.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_shortcuts() {
        assert!(!Idle.can_transition_to(Running));
        assert!(!Initializing.can_transition_to(Restarting));
        assert!(!Running.can_transition_to(Initializing));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ScanStatus::Detected.to_string(), "✅ Product detected");
    }
}
