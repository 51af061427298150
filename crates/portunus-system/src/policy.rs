//! Policy state machine.
//!
//! The single authority that interprets events against system state. It
//! consumes every dequeued event and returns the derived events to publish;
//! it never touches hardware.
//!
//! # States
//!
//! - `Boot`: waiting for the boot event.
//! - `Connecting`: armed, waiting for the network.
//! - `Running`: online; cards unlock the door.
//!
//! # Transitions
//!
//! | State | Event | Derived events | Next |
//! |-------|-------|----------------|------|
//! | `Boot` | `Boot` | `Feedback(Armed)` | `Connecting` |
//! | `Connecting` | `ConnectivityUp` | `Feedback(Online)` | `Running` |
//! | `Running` | `ConnectivityDown` | `Feedback(Offline)` | `Connecting` |
//! | any | `CardScanned` | `AccessRequest`, then `Feedback(AccessDenied)` unless running and online | unchanged |
//! | `Running`, online | `CardScanned` | `AccessRequest`, `Feedback(AccessGranted)`, `UnlockRequested(duration)` | unchanged |
//! | any | `AuthResult` | granted: `Feedback(AccessGranted)`, `UnlockRequested`; denied: `Feedback(AccessDenied)` | unchanged |
//!
//! Connectivity events always update the connectivity flag, even when they
//! cause no transition.
//!
//! # Examples
//!
//! ```
//! use portunus_core::{Event, EventKind, FeedbackKind};
//! use portunus_system::policy::{PolicyMachine, PolicyState};
//!
//! let mut fsm = PolicyMachine::new(3000);
//! let out = fsm.on_event(&Event::boot(0), 1);
//!
//! assert_eq!(fsm.state(), PolicyState::Connecting);
//! assert_eq!(out[0].feedback_kind(), Some(FeedbackKind::Armed));
//! ```

use portunus_core::{Event, EventKind, FeedbackKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tokio::time::Instant;
use tracing::{debug, info};

/// Maximum number of transitions kept in history.
const MAX_HISTORY_SIZE: usize = 32;

/// Policy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyState {
    Boot,
    Connecting,
    Running,
}

impl fmt::Display for PolicyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyState::Boot => "Boot",
            PolicyState::Connecting => "Connecting",
            PolicyState::Running => "Running",
        };
        write!(f, "{}", name)
    }
}

/// One recorded state change.
#[derive(Debug, Clone, Copy)]
pub struct PolicyTransition {
    pub from: PolicyState,
    pub to: PolicyState,
    /// Event that caused the change.
    pub trigger: EventKind,
    pub at: Instant,
}

/// Access policy state machine.
#[derive(Debug)]
pub struct PolicyMachine {
    state: PolicyState,
    connectivity_established: bool,
    unlock_duration_ms: u32,
    history: VecDeque<PolicyTransition>,
}

impl PolicyMachine {
    /// Create a machine in `Boot` that unlocks for `unlock_duration_ms` on a
    /// granted card.
    pub fn new(unlock_duration_ms: u32) -> Self {
        Self {
            state: PolicyState::Boot,
            connectivity_established: false,
            unlock_duration_ms,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn state(&self) -> PolicyState {
        self.state
    }

    pub fn connectivity_established(&self) -> bool {
        self.connectivity_established
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<PolicyTransition> {
        &self.history
    }

    /// Interpret one event. Derived events are stamped with `now_us`.
    pub fn on_event(&mut self, event: &Event, now_us: u64) -> Vec<Event> {
        let mut out = Vec::new();

        match event.kind {
            EventKind::Boot => {
                if self.state == PolicyState::Boot {
                    out.push(Event::feedback(now_us, FeedbackKind::Armed));
                    self.transition(PolicyState::Connecting, event.kind);
                }
            }
            EventKind::ConnectivityUp => {
                self.connectivity_established = true;
                if self.state == PolicyState::Connecting {
                    out.push(Event::feedback(now_us, FeedbackKind::Online));
                    self.transition(PolicyState::Running, event.kind);
                }
            }
            EventKind::ConnectivityDown => {
                self.connectivity_established = false;
                if self.state == PolicyState::Running {
                    out.push(Event::feedback(now_us, FeedbackKind::Offline));
                    self.transition(PolicyState::Connecting, event.kind);
                }
            }
            EventKind::CardScanned => {
                out.push(event.retagged(EventKind::AccessRequest));

                if self.state == PolicyState::Running && self.connectivity_established {
                    out.push(Event::feedback(now_us, FeedbackKind::AccessGranted));
                    out.push(Event::unlock_requested(now_us, self.unlock_duration_ms));
                } else {
                    debug!(state = %self.state, "Card refused while not running");
                    out.push(Event::feedback(now_us, FeedbackKind::AccessDenied));
                }
            }
            EventKind::AuthResult => {
                if let Some((granted, unlock_ms)) = event.auth_decision() {
                    if granted {
                        let ms = if unlock_ms == 0 {
                            self.unlock_duration_ms
                        } else {
                            unlock_ms
                        };
                        out.push(Event::feedback(now_us, FeedbackKind::AccessGranted));
                        out.push(Event::unlock_requested(now_us, ms));
                    } else {
                        out.push(Event::feedback(now_us, FeedbackKind::AccessDenied));
                    }
                }
            }
            _ => {}
        }

        out
    }

    fn transition(&mut self, to: PolicyState, trigger: EventKind) {
        let from = self.state;
        self.state = to;
        info!("Policy state {} -> {} on {}", from, to, trigger);

        if self.history.len() == MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(PolicyTransition {
            from,
            to,
            trigger,
            at: Instant::now(),
        });
    }
}
