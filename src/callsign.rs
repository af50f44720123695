//! Call-sign normalisation and watch-list membership
//!
//! Snapshot sources report call-signs padded with spaces and sometimes using the
//! IATA carrier prefix ("AF966") instead of the ICAO one ("AFR966"). The tracker is
//! keyed on the canonical ICAO form.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Canonical flight identifier: non-empty, upper-case, no whitespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Callsign(String);

impl Callsign {
    /// Clean a raw call-sign; returns None when nothing is left
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Callsign {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Callsign::parse(&value).ok_or_else(|| "call-sign must not be empty".to_string())
    }
}

impl From<Callsign> for String {
    fn from(value: Callsign) -> Self {
        value.0
    }
}

/// Fixed set of call-signs the tracker cares about
#[derive(Debug, Clone, Default)]
pub struct Watchlist {
    callsigns: HashSet<Callsign>,
}

impl Watchlist {
    pub fn new<I, S>(callsigns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            callsigns: callsigns
                .into_iter()
                .filter_map(|c| Callsign::parse(c.as_ref()))
                .collect(),
        }
    }

    pub fn contains(&self, callsign: &Callsign) -> bool {
        self.callsigns.contains(callsign)
    }

    pub fn len(&self) -> usize {
        self.callsigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callsigns.is_empty()
    }
}

/// Maps IATA carrier prefixes onto ICAO ones for watched flights
#[derive(Debug, Clone)]
pub struct CallsignNormalizer {
    /// (iata, icao) pairs, tried in order
    prefixes: Vec<(String, String)>,
    watchlist: Watchlist,
}

impl CallsignNormalizer {
    pub fn new(prefixes: Vec<(String, String)>, watchlist: Watchlist) -> Self {
        let prefixes = prefixes
            .into_iter()
            .map(|(iata, icao)| (iata.to_uppercase(), icao.to_uppercase()))
            .collect();
        Self {
            prefixes,
            watchlist,
        }
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    /// Canonicalise a raw call-sign
    ///
    /// The first prefix pair whose ICAO substitution yields a watched call-sign wins;
    /// otherwise the cleaned call-sign is returned unchanged.
    pub fn normalize(&self, raw: &str) -> Option<Callsign> {
        let cleaned = Callsign::parse(raw)?;
        for (iata, icao) in &self.prefixes {
            if let Some(rest) = cleaned.as_str().strip_prefix(iata.as_str())
                && let Some(candidate) = Callsign::parse(&format!("{}{}", icao, rest))
                && self.watchlist.contains(&candidate)
            {
                return Some(candidate);
            }
        }
        Some(cleaned)
    }

    /// Normalise and keep only watched call-signs
    pub fn watched(&self, raw: &str) -> Option<Callsign> {
        self.normalize(raw)
            .filter(|callsign| self.watchlist.contains(callsign))
    }
}
