pub mod row;
pub mod writer;

pub use row::{LedgerRow, LedgerStatus, PostLogEntry, format_date};
pub use writer::{
    LedgerWriter, POST_LOG_NOTE, POST_TIME_UNAVAILABLE, PostLogWrite, format_post_time,
};
