//! Operating mode state machine
//!
//! The mode is the only state that decides which requests and interrupt
//! paths are live. Every transition goes through [`OpMode::transition`];
//! the side effects belong to the engine.

/// Operating modes of the acquisition unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpMode {
    /// Not initialized, hardware off
    Uninit,
    /// Free-running, live readout available
    Idle,
    /// A capture just closed, re-arm decided on the next group
    RearmPending,
    /// Watching the source channel for an edge
    Armed,
    /// Collecting post-trigger samples
    Triggered,
    /// Collecting a fixed number of samples
    BlockCapture,
    /// Streaming until stopped
    Stream,
    /// Overrun or queue failure, waiting for recovery
    EmergencyShutdown,
    /// A transition body is running; re-entering handlers back off
    Transitioning,
}

/// Causes of mode transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeEvent {
    /// Init finished
    InitComplete,
    /// Arm request
    Arm,
    /// Disarm request, or re-arm declined
    Disarm,
    /// Trigger detector fired
    EdgeDetected,
    /// Force trigger request
    ManualTrigger,
    /// Block capture request
    BlockRequested,
    /// Stream start request
    StreamRequested,
    /// Closing chunk queued or stream stopped
    SessionClosed {
        /// Re-arm after closing
        rearm: bool,
    },
    /// Overrun or enqueue failure
    Fault,
    /// Emergency hold time over
    RecoveryElapsed,
    /// Abort request
    Abort,
    /// Unit deinit
    Teardown,
}

impl OpMode {
    /// Wire code reported by the status request
    pub fn to_byte(self) -> u8 {
        match self {
            OpMode::Uninit => 0,
            OpMode::Idle => 1,
            OpMode::RearmPending => 2,
            OpMode::Armed => 3,
            OpMode::Triggered => 4,
            OpMode::BlockCapture => 5,
            OpMode::Stream => 6,
            OpMode::EmergencyShutdown => 7,
            OpMode::Transitioning => 0xFF,
        }
    }

    /// Check if a capture session is collecting buffer data
    pub fn is_capturing(&self) -> bool {
        matches!(self, OpMode::Triggered | OpMode::BlockCapture | OpMode::Stream)
    }

    /// Check if arming, forcing or starting a capture is legal
    pub fn is_armable(&self) -> bool {
        matches!(self, OpMode::Idle | OpMode::Armed | OpMode::RearmPending)
    }

    /// Check if live raw and smoothed readout is available
    pub fn allows_readout(&self) -> bool {
        matches!(self, OpMode::Idle | OpMode::Armed)
    }

    /// Next mode for `event`, or `None` if the event is illegal here
    pub fn transition(self, event: ModeEvent) -> Option<Self> {
        use ModeEvent::*;
        use OpMode::*;

        match (self, event) {
            // A transition in progress accepts nothing
            (Transitioning, _) => None,

            (Uninit, InitComplete) => Some(Idle),

            // Arming and disarming
            (Idle | Armed | RearmPending, Arm) => Some(Armed),
            (Idle | Armed | RearmPending, Disarm) => Some(Idle),

            // Opening a session
            (Armed, EdgeDetected) => Some(Triggered),
            (Idle | Armed | RearmPending, ManualTrigger) => Some(Triggered),
            (Idle | Armed | RearmPending, BlockRequested) => Some(BlockCapture),
            (Idle | Armed | RearmPending, StreamRequested) => Some(Stream),

            // Closing a session
            (Triggered | BlockCapture | Stream, SessionClosed { rearm: true }) => {
                Some(RearmPending)
            }
            (Triggered | BlockCapture | Stream, SessionClosed { rearm: false }) => Some(Idle),

            // Faults and recovery
            (Idle | Armed | RearmPending | Triggered | BlockCapture | Stream, Fault) => {
                Some(EmergencyShutdown)
            }
            (EmergencyShutdown, RecoveryElapsed) => Some(Idle),

            (Idle | Armed | RearmPending | Triggered | BlockCapture | Stream, Abort) => {
                Some(Idle)
            }

            (_, Teardown) => Some(Uninit),

            _ => None,
        }
    }
}
