//! Station catalog
//!
//! Stations are read from a TOML file of `[[stations]]` tables. Inactive
//! stations stay in the catalog but are hidden from listings.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::StreamSource;
use crate::error::CatalogError;

/// Station category used for browsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    News,
    Music,
    Sports,
    Cultural,
    Emergency,
    Community,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::News,
        Category::Music,
        Category::Sports,
        Category::Cultural,
        Category::Emergency,
        Category::Community,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::News => "news",
            Category::Music => "music",
            Category::Sports => "sports",
            Category::Cultural => "cultural",
            Category::Emergency => "emergency",
            Category::Community => "community",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream quality label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

/// One station entry as stored in the catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub stream_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_stream_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    pub category: Category,
    pub region: String,
    #[serde(default)]
    pub quality: Quality,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl StationRecord {
    /// Playable source for this station
    pub fn to_source(&self) -> StreamSource {
        StreamSource {
            id: self.id.clone(),
            primary_url: self.stream_url.clone(),
            backup_url: self.backup_stream_url.clone(),
            display_name: self.name.clone(),
            category: Some(self.category),
            region: Some(self.region.clone()),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CatalogFile {
    #[serde(default)]
    stations: Vec<StationRecord>,
}

/// In-memory station list
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: Vec<StationRecord>,
}

impl StationCatalog {
    /// Build a catalog, rejecting duplicate ids and unplayable stations
    pub fn new(stations: Vec<StationRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();

        for station in &stations {
            if !seen.insert(station.id.as_str()) {
                return Err(CatalogError::DuplicateId(station.id.clone()));
            }

            station
                .to_source()
                .validate()
                .map_err(|e| CatalogError::InvalidStation {
                    id: station.id.clone(),
                    reason: e.to_string(),
                })?;
        }

        Ok(Self { stations })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(contents)?;
        Self::new(file.stations)
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&contents)?;
        tracing::info!(
            "Loaded {} stations ({} active) from {}",
            catalog.len(),
            catalog.active().count(),
            path.display()
        );
        Ok(catalog)
    }

    /// Active stations in file order
    pub fn active(&self) -> impl Iterator<Item = &StationRecord> {
        self.stations.iter().filter(|s| s.is_active)
    }

    /// Active stations in a category, or all of them for `None`
    pub fn by_category(&self, category: Option<Category>) -> Vec<&StationRecord> {
        self.active()
            .filter(|s| category.map_or(true, |c| s.category == c))
            .collect()
    }

    /// Look up any station, active or not
    pub fn find(&self, id: &str) -> Option<&StationRecord> {
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
