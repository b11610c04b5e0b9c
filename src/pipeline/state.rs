//! Import pipeline states and their allowed transitions.
//!
//! Idle → Preprocessing → Recognizing → Parsed → Imported, with Failed
//! reachable from the two working states. Any state may be reset to Idle.

/// Pipeline state as observed by callers.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    /// No image loaded
    Idle,
    /// Scaling, cropping and binarizing the source image
    Preprocessing,
    /// OCR running, with progress in 0..=100
    Recognizing(u8),
    /// Rows available for review, with the row count
    Parsed(usize),
    /// Rows committed, with the number of matches written
    Imported(usize),
    /// Preprocessing or recognition failed
    Failed(String),
}

/// Discriminant of [`PipelineState`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Idle,
    Preprocessing,
    Recognizing,
    Parsed,
    Imported,
    Failed,
}

impl PipelineState {
    pub fn kind(&self) -> StateKind {
        match self {
            PipelineState::Idle => StateKind::Idle,
            PipelineState::Preprocessing => StateKind::Preprocessing,
            PipelineState::Recognizing(_) => StateKind::Recognizing,
            PipelineState::Parsed(_) => StateKind::Parsed,
            PipelineState::Imported(_) => StateKind::Imported,
            PipelineState::Failed(_) => StateKind::Failed,
        }
    }
}

impl StateKind {
    /// Whether the pipeline may move from `self` to `next`.
    pub fn can_transition_to(self, next: StateKind) -> bool {
        use StateKind::*;

        match (self, next) {
            (_, Idle) => true,
            (Idle | Parsed | Imported | Failed, Preprocessing) => true,
            (Preprocessing | Parsed | Imported | Failed, Recognizing) => true,
            // Progress updates
            (Recognizing, Recognizing) => true,
            (Recognizing | Parsed | Imported | Failed, Parsed) => true,
            (Parsed, Imported) => true,
            (Preprocessing | Recognizing, Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateKind::Idle => write!(f, "Idle"),
            StateKind::Preprocessing => write!(f, "Preprocessing"),
            StateKind::Recognizing => write!(f, "Recognizing"),
            StateKind::Parsed => write!(f, "Parsed"),
            StateKind::Imported => write!(f, "Imported"),
            StateKind::Failed => write!(f, "Failed"),
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "Idle"),
            PipelineState::Preprocessing => write!(f, "Preprocessing"),
            PipelineState::Recognizing(progress) => write!(f, "Recognizing ({}%)", progress),
            PipelineState::Parsed(rows) => write!(f, "Parsed {} rows", rows),
            PipelineState::Imported(count) => write!(f, "Imported {} matches", count),
            PipelineState::Failed(msg) => write!(f, "Failed: {}", msg),
        }
    }
}
