pub mod cycle_fit;
pub mod em;

pub use cycle_fit::{fit_cycle_params, CycleFitResult};
pub use em::{
    personalize_emission, IterationDelta, PersonalizationOptions, PersonalizationResult,
};
