//! The closed set of cache-style sources served by the read path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{HeimdallError, Result};

/// A cache-style upstream feed with its own freshness clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Astronomy Picture of the Day.
    Apod,
    /// Near-Earth object feed.
    Neo,
    /// DONKI solar flares.
    Flr,
    /// DONKI coronal mass ejections.
    Cme,
    /// Next scheduled SpaceX launch.
    Spacex,
}

/// Alternate names accepted on the read path, mapped to their canonical source.
const ALIASES: &[(&str, Source)] = &[("donki_flr", Source::Flr), ("donki_cme", Source::Cme)];

impl Source {
    /// Every source, in warm-up order.
    pub const ALL: [Source; 5] = [
        Source::Apod,
        Source::Neo,
        Source::Flr,
        Source::Cme,
        Source::Spacex,
    ];

    /// Canonical name, also used as the store key.
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Apod => "apod",
            Source::Neo => "neo",
            Source::Flr => "flr",
            Source::Cme => "cme",
            Source::Spacex => "spacex",
        }
    }

    /// Resolve a canonical name or alias. Returns `None` for anything else.
    pub fn resolve(name: &str) -> Option<Source> {
        Source::ALL
            .into_iter()
            .find(|s| s.as_str() == name)
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, s)| *s)
            })
    }

    /// Whether the source falls back to the long TTL (daily content).
    pub fn uses_long_ttl(self) -> bool {
        matches!(self, Source::Apod)
    }

    /// Sorted canonical names plus aliases, as accepted by [`Source::resolve`].
    pub fn valid_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Source::ALL
            .iter()
            .map(|s| s.as_str())
            .chain(ALIASES.iter().map(|(alias, _)| *alias))
            .collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = HeimdallError;

    fn from_str(s: &str) -> Result<Self> {
        Source::resolve(s).ok_or_else(|| {
            HeimdallError::NoData(format!(
                "Unknown source: '{s}'. Valid sources: {:?}",
                Source::valid_names()
            ))
        })
    }
}
