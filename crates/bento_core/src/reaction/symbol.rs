use std::fmt;

use crate::ports::EmojiRef;

const VARIATION_SELECTOR_16: char = '\u{FE0F}';

/// The fixed reaction alphabet of the order message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSymbol {
    /// Boxed lunch.
    Bento,
    /// Rice only.
    Rice,
    /// Cancellation mark.
    CancelMark,
}

impl OrderSymbol {
    pub const ALL: [OrderSymbol; 3] = [OrderSymbol::Bento, OrderSymbol::Rice, OrderSymbol::CancelMark];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderSymbol::Bento => "🍱",
            OrderSymbol::Rice => "🍚",
            OrderSymbol::CancelMark => "❌",
        }
    }

    pub fn parse(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == symbol)
    }

    pub fn is_food(self) -> bool {
        !matches!(self, OrderSymbol::CancelMark)
    }
}

impl fmt::Display for OrderSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduce a gateway emoji to the string used for comparison: the unicode
/// name without presentation selectors, or `name:id` for custom emoji.
/// `None` when the payload has no usable name.
pub fn normalize_emoji(emoji: &EmojiRef) -> Option<String> {
    let name = emoji.name.as_deref()?.trim();
    if name.is_empty() {
        return None;
    }
    match emoji.id.as_deref() {
        Some(id) => Some(format!("{name}:{id}")),
        None => Some(name.chars().filter(|c| *c != VARIATION_SELECTOR_16).collect()),
    }
}

/// The emoji exactly as the platform stores the reaction, for the reaction
/// endpoints: the delivered unicode name, or `name:id` for custom emoji.
pub fn reaction_key(emoji: &EmojiRef) -> Option<String> {
    let name = emoji.name.as_deref().filter(|name| !name.trim().is_empty())?;
    match emoji.id.as_deref() {
        Some(id) => Some(format!("{name}:{id}")),
        None => Some(name.to_string()),
    }
}
