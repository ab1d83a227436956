pub mod policy;
pub mod settings;

pub use policy::{DeadlineError, DeadlineMode, TimeOfDay, compute_deadline, is_past_deadline};
pub use settings::{CheckFlag, DeadlineSettings, DeadlineSnapshot, load_settings};
