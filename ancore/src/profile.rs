//! Light profiles: which expression drives which light, per aircraft.
//!
//! A profile is a TOML document with a `[default]` table and one table per aircraft under
//! `[aircraft]`. An aircraft table may name several aircraft separated by commas:
//!
//! ```toml
//! [default]
//! MasterEnable = "A:ELECTRICAL MASTER BATTERY, bool == 1"
//! LowVolts = "A:ELECTRICAL MAIN BUS VOLTAGE:1, volts <= 28"
//!
//! [aircraft."Aircraft1, Aircraft2"]
//! LowVolts = "A:ELECTRICAL MAIN BUS VOLTAGE:3, volts <= 26"
//!
//! [aircraft.Aircraft1]
//! Invert = "NAV, APR"
//! ```
use std::{collections::BTreeMap, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{AnError, AnResult};

/// Anything that can answer "what is `key` for `aircraft`".
pub trait ConfigSource: Send + Sync {
    fn lookup(&self, aircraft: &str, key: &str) -> Option<&str>;
}

pub type Section = BTreeMap<String, String>;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub default: Section,
    #[serde(default)]
    pub aircraft: BTreeMap<String, Section>,
}

impl Profile {
    pub fn from_toml(text: &str, file: &str) -> AnResult<Self> {
        toml::from_str(text).map_err(|source| AnError::ProfileParse {
            source,
            file: file.to_string(),
        })
    }

    pub fn load(path: &Path) -> AnResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let profile = Self::from_toml(&text, &path.display().to_string())?;
        info!(
            "loaded light profile {} ({} aircraft section(s))",
            path.display(),
            profile.aircraft.len()
        );
        Ok(profile)
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default.insert(key.into(), value.into());
        self
    }

    pub fn with_aircraft(
        mut self,
        aircraft: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.aircraft
            .entry(aircraft.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Every aircraft named by some section.
    pub fn aircraft_names(&self) -> impl Iterator<Item = &str> {
        self.aircraft.keys().flat_map(|names| section_names(names))
    }

    /// Sections applying to `aircraft`, most specific (fewest names) first.
    fn sections_for(&self, aircraft: &str) -> Vec<&Section> {
        let mut sections: Vec<(usize, &Section)> = self
            .aircraft
            .iter()
            .filter_map(|(names, section)| {
                let names: Vec<&str> = section_names(names).collect();
                names
                    .contains(&aircraft)
                    .then_some((names.len(), section))
            })
            .collect();
        sections.sort_by_key(|(count, _)| *count);
        sections.into_iter().map(|(_, section)| section).collect()
    }
}

fn section_names(names: &str) -> impl Iterator<Item = &str> {
    names.split(',').map(str::trim).filter(|name| !name.is_empty())
}

impl ConfigSource for Profile {
    fn lookup(&self, aircraft: &str, key: &str) -> Option<&str> {
        self.sections_for(aircraft)
            .into_iter()
            .chain(std::iter::once(&self.default))
            .find_map(|section| section.get(key))
            .map(String::as_str)
    }
}

/// Several sources consulted in order; the first one knowing a key wins.
#[derive(Default)]
pub struct ProfileChain {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ProfileChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl ConfigSource + 'static) -> Self {
        self.push(source);
        self
    }

    pub fn push(&mut self, source: impl ConfigSource + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl ConfigSource for ProfileChain {
    fn lookup(&self, aircraft: &str, key: &str) -> Option<&str> {
        self.sources
            .iter()
            .find_map(|source| source.lookup(aircraft, key))
    }
}
