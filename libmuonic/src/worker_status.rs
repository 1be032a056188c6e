/// What the processor is currently doing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Reading,
    Flushing,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reading => write!(f, "Reading"),
            Self::Flushing => write!(f, "Flushing"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Progress report sent from the processor to the UI
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub lines_read: u64,
    pub stage: Stage,
}

impl WorkerStatus {
    pub fn new(progress: f32, lines_read: u64, stage: Stage) -> Self {
        Self {
            progress,
            lines_read,
            stage,
        }
    }
}
