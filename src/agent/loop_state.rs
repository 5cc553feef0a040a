//! Agent loop state management
//!
//! Tracks the orchestrator's state machine and the iteration budget shared
//! by the main loop and sub-agent loops.

/// Phase of the main agent loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Thinking,
    DelegatingToSubAgent,
    InvokingToolDirectly,
    EmittingFinalAnswer,
    Done,
}

/// State of a bounded reasoning loop
#[derive(Debug, Clone)]
pub struct AgentLoopState {
    /// Number of completed turns
    pub turn: usize,
    /// Maximum allowed turns
    pub max_turns: usize,
    /// Current phase
    pub state: OrchestratorState,
    /// Last model response seen by this loop
    pub last_response: Option<String>,
}

impl AgentLoopState {
    /// Create a new loop state with the given max turns
    pub fn new(max_turns: usize) -> Self {
        Self {
            turn: 0,
            max_turns,
            state: OrchestratorState::Thinking,
            last_response: None,
        }
    }

    /// Check if the loop may issue another model call
    pub fn should_continue(&self) -> bool {
        self.turn < self.max_turns
            && !matches!(
                self.state,
                OrchestratorState::EmittingFinalAnswer | OrchestratorState::Done
            )
    }

    /// Record a model response and count the turn
    pub fn record_response(&mut self, response: &str) {
        self.turn += 1;
        self.last_response = Some(response.to_string());
    }

    pub fn transition(&mut self, next: OrchestratorState) {
        tracing::debug!(from = ?self.state, to = ?next, turn = self.turn, "Loop transition");
        self.state = next;
    }

    /// Whether the budget ran out before a terminal state
    pub fn exhausted(&self) -> bool {
        self.turn >= self.max_turns
            && !matches!(
                self.state,
                OrchestratorState::EmittingFinalAnswer | OrchestratorState::Done
            )
    }
}
