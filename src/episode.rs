use core::{cmp::Ordering, fmt};
use std::sync::LazyLock;

use compact_str::CompactString;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Column order of the persisted file.
pub const FIELDS: [&str; 6] = ["episode_number", "title", "url", "date", "topic", "description"];

pub const UNKNOWN: &str = "Unknown";
pub const NO_DESCRIPTION: &str = "No description available";

static SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^S(\d+)E(\d+)$").unwrap());

/// One row of the episode table. Field order matches [`FIELDS`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub episode_number: CompactString,
    pub title: String,
    pub url: String,
    pub date: String,
    pub topic: String,
    pub description: String,
}

impl Record {
    #[inline]
    pub fn number(&self) -> EpisodeNumber {
        EpisodeNumber::parse(&self.episode_number)
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.episode_number == UNKNOWN
    }
}

/// Parsed form of `episode_number`.
///
/// Anything that is neither a plain integer nor `S<season>E<episode>` ends up as
/// [`EpisodeNumber::Unknown`], the same bucket as the `"Unknown"` sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EpisodeNumber {
    Unknown,
    SeasonEpisode(u32, u32),
    Numeric(i64),
}

impl EpisodeNumber {
    pub fn parse(s: &str) -> Self {
        if s == UNKNOWN {
            return Self::Unknown;
        }
        if let Some(c) = SEASON_EPISODE.captures(s) {
            if let (Ok(season), Ok(episode)) = (c[1].parse(), c[2].parse()) {
                return Self::SeasonEpisode(season, episode);
            }
            return Self::Unknown;
        }
        s.trim().parse().map_or(Self::Unknown, Self::Numeric)
    }

    /// `(bucket, major, minor)`; compared as a tuple, larger sorts first on output.
    pub const fn sort_key(self) -> (u8, i64, i64) {
        match self {
            Self::Unknown => (0, 0, 0),
            Self::SeasonEpisode(s, e) => (1, s as i64, e as i64),
            Self::Numeric(n) => (2, n, 0),
        }
    }
}

impl Ord for EpisodeNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for EpisodeNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str(UNKNOWN),
            Self::SeasonEpisode(s, e) => write!(f, "S{s}E{e}"),
            Self::Numeric(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EpisodeNumber::{self, *};

    #[test]
    fn parses_all_shapes() {
        assert_eq!(EpisodeNumber::parse("2154"), Numeric(2154));
        assert_eq!(EpisodeNumber::parse("S8E6"), SeasonEpisode(8, 6));
        assert_eq!(EpisodeNumber::parse("Unknown"), Unknown);
        assert_eq!(EpisodeNumber::parse("Episode 12"), Unknown);
        assert_eq!(EpisodeNumber::parse("s8e6"), Unknown);
        assert_eq!(EpisodeNumber::parse(""), Unknown);
        assert_eq!(EpisodeNumber::parse(" 42 "), Numeric(42));
    }

    #[test]
    fn oversized_numbers_fall_back() {
        assert_eq!(EpisodeNumber::parse("S99999999999E1"), Unknown);
        assert_eq!(EpisodeNumber::parse("99999999999999999999999"), Unknown);
    }

    #[test]
    fn buckets_dominate_values() {
        assert!(Numeric(1) > SeasonEpisode(1000, 1000));
        assert!(SeasonEpisode(0, 0) > Unknown);
        assert!(SeasonEpisode(8, 6) > SeasonEpisode(8, 5));
        assert!(SeasonEpisode(9, 1) > SeasonEpisode(8, 60));
        assert!(Numeric(2200) > Numeric(2100));
        assert_eq!(SeasonEpisode(3, 4).to_string(), "S3E4");
    }
}
