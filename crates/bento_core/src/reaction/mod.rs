pub mod gate;
pub mod symbol;

pub use gate::{
    AdmissionMetrics, AdmissionReject, AdmissionRejectReason, GateOutcome, IgnoreReason,
    OrderEvent, ReactionAction, SymbolClass, admit_add, admit_remove, classify_symbol, screen,
};
pub use symbol::{OrderSymbol, normalize_emoji, reaction_key};
