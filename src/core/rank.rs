use std::fmt;
use std::str::FromStr;

/// Access tier used for admission control. Ordering is numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum RankLevel {
    #[default]
    None = 0,
    Unverified = 1,
    BasicUser = 2,
    PowerUser = 3,
    Administrator = 4,
    SuperUser = 5,
}

impl RankLevel {
    pub const ALL: [RankLevel; 6] = [
        RankLevel::None,
        RankLevel::Unverified,
        RankLevel::BasicUser,
        RankLevel::PowerUser,
        RankLevel::Administrator,
        RankLevel::SuperUser,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// True when this rank meets `required`.
    pub fn satisfies(self, required: RankLevel) -> bool {
        self.value() >= required.value()
    }

    pub fn name(self) -> &'static str {
        match self {
            RankLevel::None => "None",
            RankLevel::Unverified => "Unverified",
            RankLevel::BasicUser => "BasicUser",
            RankLevel::PowerUser => "PowerUser",
            RankLevel::Administrator => "Administrator",
            RankLevel::SuperUser => "SuperUser",
        }
    }
}

impl fmt::Display for RankLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rank level: {0}")]
pub struct UnknownRank(pub String);

impl FromStr for RankLevel {
    type Err = UnknownRank;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<u8>() {
            return Self::from_value(value).ok_or_else(|| UnknownRank(s.to_string()));
        }

        Self::ALL
            .into_iter()
            .find(|rank| rank.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownRank(s.to_string()))
    }
}
