use std::fmt;

use serde::{Deserialize, Serialize};

/// Tone applied to notification text. Closed set; anything else resolves to
/// [`Personality::Default`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    #[default]
    Default,
    Snarky,
    Jarvis,
    Roaster,
    Butler,
    Coach,
    Zen,
}

const NAMES: [(&str, Personality); 7] = [
    ("default", Personality::Default),
    ("snarky", Personality::Snarky),
    ("jarvis", Personality::Jarvis),
    ("roaster", Personality::Roaster),
    ("butler", Personality::Butler),
    ("coach", Personality::Coach),
    ("zen", Personality::Zen),
];

impl Personality {
    pub const ALL: [Personality; 7] = [
        Self::Default,
        Self::Snarky,
        Self::Jarvis,
        Self::Roaster,
        Self::Butler,
        Self::Coach,
        Self::Zen,
    ];

    /// Exact lookup (case-insensitive, surrounding whitespace ignored).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, p)| *p)
    }

    /// Lookup with fallback to `Default` for unknown names.
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Snarky => "snarky",
            Self::Jarvis => "jarvis",
            Self::Roaster => "roaster",
            Self::Butler => "butler",
            Self::Coach => "coach",
            Self::Zen => "zen",
        }
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMES.iter().map(|(n, _)| *n)
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
