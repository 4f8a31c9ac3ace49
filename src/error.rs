use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// `update` was called before `compute_prior` on the same session.
    #[error("prior has not been computed for this session (user={user_id}, date={date})")]
    PriorNotComputed { user_id: String, date: String },

    /// Personalization was asked to run on too little history. Callers must
    /// not substitute a low-confidence table when they see this.
    #[error("insufficient data for personalization: {reason} ({available} available, {required} required)")]
    InsufficientData {
        reason: String,
        available: usize,
        required: usize,
    },
}
