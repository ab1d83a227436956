pub mod reconcile;
pub mod state;
pub mod title;

pub use reconcile::{Reconciler, SeedSource, SessionSeed, apply_order_symbols};
pub use state::{Adoption, OrderMessage, SessionState};
pub use title::{title_keys, title_names_date};
