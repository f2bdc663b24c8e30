//! Usage categories and the bundle-identifier classification rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of usage categories.
///
/// The variant order here is the fixed display order used by stacked
/// renderings; [`UsageCategory::DISPLAY_ORDER`] exposes it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageCategory {
    Productivity,
    Creativity,
    Social,
    Entertainment,
    Utilities,
    Other,
}

impl UsageCategory {
    /// Fixed ordering for stacked display, stable across releases.
    pub const DISPLAY_ORDER: [Self; 6] = [
        Self::Productivity,
        Self::Creativity,
        Self::Social,
        Self::Entertainment,
        Self::Utilities,
        Self::Other,
    ];

    /// String representation for output and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Productivity => "productivity",
            Self::Creativity => "creativity",
            Self::Social => "social",
            Self::Entertainment => "entertainment",
            Self::Utilities => "utilities",
            Self::Other => "other",
        }
    }

    /// Position of this category in [`Self::DISPLAY_ORDER`].
    #[must_use]
    pub fn display_rank(self) -> usize {
        Self::DISPLAY_ORDER
            .iter()
            .position(|c| *c == self)
            .unwrap_or(Self::DISPLAY_ORDER.len())
    }
}

impl fmt::Display for UsageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UsageCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "productivity" => Ok(Self::Productivity),
            "creativity" => Ok(Self::Creativity),
            "social" => Ok(Self::Social),
            "entertainment" => Ok(Self::Entertainment),
            "utilities" => Ok(Self::Utilities),
            "other" => Ok(Self::Other),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Error type for unknown category strings.
#[derive(Debug, Clone)]
pub struct UnknownCategory(String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

/// Ordered substring rules over the lower-cased bundle identifier.
///
/// First match wins, so rule order is part of the classification contract:
/// reordering or inserting ahead of an existing rule changes outcomes for
/// identifiers matching more than one substring and requires a version note.
const RULES: &[(&str, UsageCategory)] = &[
    // Productivity
    ("xcode", UsageCategory::Productivity),
    ("vscode", UsageCategory::Productivity),
    ("jetbrains", UsageCategory::Productivity),
    ("sublime", UsageCategory::Productivity),
    ("terminal", UsageCategory::Productivity),
    ("iterm", UsageCategory::Productivity),
    ("mail", UsageCategory::Productivity),
    ("calendar", UsageCategory::Productivity),
    ("notes", UsageCategory::Productivity),
    ("reminders", UsageCategory::Productivity),
    ("notion", UsageCategory::Productivity),
    ("obsidian", UsageCategory::Productivity),
    ("word", UsageCategory::Productivity),
    ("excel", UsageCategory::Productivity),
    ("powerpoint", UsageCategory::Productivity),
    ("keynote", UsageCategory::Productivity),
    ("numbers", UsageCategory::Productivity),
    ("pages", UsageCategory::Productivity),
    // Creativity
    ("photoshop", UsageCategory::Creativity),
    ("illustrator", UsageCategory::Creativity),
    ("lightroom", UsageCategory::Creativity),
    ("sketch", UsageCategory::Creativity),
    ("figma", UsageCategory::Creativity),
    ("garageband", UsageCategory::Creativity),
    ("logic", UsageCategory::Creativity),
    ("finalcut", UsageCategory::Creativity),
    ("imovie", UsageCategory::Creativity),
    ("blender", UsageCategory::Creativity),
    ("procreate", UsageCategory::Creativity),
    // Social
    ("messages", UsageCategory::Social),
    ("mobilesms", UsageCategory::Social),
    ("facetime", UsageCategory::Social),
    ("whatsapp", UsageCategory::Social),
    ("telegram", UsageCategory::Social),
    ("signal", UsageCategory::Social),
    ("slack", UsageCategory::Social),
    ("discord", UsageCategory::Social),
    ("teams", UsageCategory::Social),
    ("zoom", UsageCategory::Social),
    // Entertainment
    ("youtube", UsageCategory::Entertainment),
    ("netflix", UsageCategory::Entertainment),
    ("spotify", UsageCategory::Entertainment),
    ("music", UsageCategory::Entertainment),
    ("podcasts", UsageCategory::Entertainment),
    ("twitch", UsageCategory::Entertainment),
    ("steam", UsageCategory::Entertainment),
    ("game", UsageCategory::Entertainment),
    ("hulu", UsageCategory::Entertainment),
    ("primevideo", UsageCategory::Entertainment),
    // Utilities
    ("finder", UsageCategory::Utilities),
    ("systempreferences", UsageCategory::Utilities),
    ("systemsettings", UsageCategory::Utilities),
    ("activitymonitor", UsageCategory::Utilities),
    ("diskutility", UsageCategory::Utilities),
    ("archiveutility", UsageCategory::Utilities),
    ("calculator", UsageCategory::Utilities),
    ("appstore", UsageCategory::Utilities),
    ("installer", UsageCategory::Utilities),
];

/// Classifies a bundle identifier into a usage category.
///
/// Pure function: the identifier is lower-cased and tested against the
/// ordered rule table; the first matching substring decides. Identifiers
/// matching no rule classify as [`UsageCategory::Other`].
#[must_use]
pub fn categorize(bundle_id: &str) -> UsageCategory {
    let lowered = bundle_id.to_lowercase();
    RULES
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map_or(UsageCategory::Other, |(_, category)| *category)
}
