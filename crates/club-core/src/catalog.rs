//! Project and event catalog port.
//!
//! The engine never reads catalog files itself during a turn. It talks to a
//! [`CatalogStore`], which hands out normalized project offers and event
//! definitions and accepts persistent project upgrades. [`InMemoryCatalog`]
//! is the standard implementation, loaded once from `data/catalog.yaml`
//! through [`CatalogFile`].

use std::path::Path;

use club_types::{CountryCode, EventDefinition, EventOperation, Project, ProjectUpgrade};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::weighting::GdpTable;

/// MRV standard recorded for projects that do not name one.
pub const UNSPECIFIED_MRV: &str = "Not specified";

/// Errors that can occur when loading a catalog file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Failed to read the catalog file from disk.
    #[error("failed to read catalog file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse catalog YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for CatalogError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Read and write access to the project and event libraries.
pub trait CatalogStore: Send + Sync {
    /// Every project in the library, in library order.
    fn list_projects(&self) -> Vec<Project>;

    /// The current library record for `id`.
    fn project_by_id(&self, id: &str) -> Option<Project>;

    /// Apply a persistent upgrade. Returns `false` when the project is unknown.
    fn mutate_project(&mut self, upgrade: &ProjectUpgrade) -> bool;

    /// Every event definition.
    fn list_events(&self) -> &[EventDefinition];
}

/// Catalog held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryCatalog {
    projects: Vec<Project>,
    events: Vec<EventDefinition>,
}

impl InMemoryCatalog {
    /// Build a catalog from already-normalized projects and events.
    pub const fn new(projects: Vec<Project>, events: Vec<EventDefinition>) -> Self {
        Self { projects, events }
    }
}

impl CatalogStore for InMemoryCatalog {
    fn list_projects(&self) -> Vec<Project> {
        self.projects.clone()
    }

    fn project_by_id(&self, id: &str) -> Option<Project> {
        self.projects.iter().find(|p| p.id == id).cloned()
    }

    fn mutate_project(&mut self, upgrade: &ProjectUpgrade) -> bool {
        match self.projects.iter_mut().find(|p| p.id == upgrade.project_id) {
            Some(project) => {
                apply_upgrade(project, upgrade);
                true
            }
            None => false,
        }
    }

    fn list_events(&self) -> &[EventDefinition] {
        &self.events
    }
}

/// Apply `upgrade` to `project` in place.
///
/// Multipliers apply only when finite, non-zero and not 1, and the product
/// is rounded to a whole unit. Deltas apply when finite and non-zero.
pub fn apply_upgrade(project: &mut Project, upgrade: &ProjectUpgrade) {
    let scale = |value: f64, multiplier: f64| {
        if multiplier.is_finite() && multiplier != 0.0 && (multiplier - 1.0).abs() > f64::EPSILON {
            (value * multiplier).round()
        } else {
            value
        }
    };
    let shift = |value: f64, delta: f64| {
        if delta.is_finite() && delta != 0.0 {
            value + delta
        } else {
            value
        }
    };
    project.co2e_mitigation = scale(project.co2e_mitigation, upgrade.mitigation_multiplier);
    project.supply_pressure = scale(project.supply_pressure, upgrade.supply_multiplier);
    project.xcr_bid = scale(project.xcr_bid, upgrade.xcr_bid_multiplier);
    project.sentiment_effect = shift(project.sentiment_effect, upgrade.sentiment_effect_delta);
    project.insurance_buffer = shift(project.insurance_buffer, upgrade.insurance_buffer_delta);
}

/// Draw up to `count` distinct project offers by partial shuffle.
pub fn draw_projects(
    catalog: &dyn CatalogStore,
    count: usize,
    rng: &mut impl rand::Rng,
) -> Vec<Project> {
    let mut library = catalog.list_projects();
    if library.is_empty() {
        warn!("Project catalog is empty, no offers drawn");
        return library;
    }
    let len = library.len();
    let take = count.min(len);
    for i in 0..take {
        let j = rng.random_range(i..len);
        library.swap(i, j);
    }
    library.truncate(take);
    debug!(offers = ?library.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), "Drew project offers");
    library
}

/// Draw one event uniformly from the catalog.
pub fn random_event(
    catalog: &dyn CatalogStore,
    rng: &mut impl rand::Rng,
) -> Option<EventDefinition> {
    let events = catalog.list_events();
    if events.is_empty() {
        warn!("Event catalog is empty, no event drawn");
        return None;
    }
    let idx = rng.random_range(0..events.len());
    events.get(idx).cloned()
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// A project entry as written in the catalog file; every field but `id` may
/// be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawProject {
    /// Project identifier; entries without one are dropped.
    pub id: Option<String>,
    /// Display name; falls back to the id.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Mitigated tonnes.
    pub co2e_mitigation: Option<f64>,
    /// Reward cost; falls back to the mitigation.
    pub xcr_bid: Option<f64>,
    /// Supply pressure.
    pub supply_pressure: Option<f64>,
    /// Sentiment effect.
    pub sentiment_effect: Option<f64>,
    /// Insurance buffer.
    pub insurance_buffer: Option<f64>,
    /// Co-benefits text.
    pub co_benefits: Option<String>,
    /// MRV standard; falls back to [`UNSPECIFIED_MRV`].
    pub mrv_standard: Option<String>,
}

fn finite_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(fallback)
}

fn text_or(value: Option<String>, fallback: &str) -> String {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

impl RawProject {
    /// Normalize into a [`Project`], or `None` when the id is missing.
    pub fn normalize(self) -> Option<Project> {
        let id = self
            .id
            .map(|i| i.trim().to_owned())
            .filter(|i| !i.is_empty())?;
        let mitigation = finite_or(self.co2e_mitigation, 0.0).max(0.0);
        Some(Project {
            name: text_or(self.name, &id),
            description: self.description.unwrap_or_default(),
            co2e_mitigation: mitigation,
            xcr_bid: finite_or(self.xcr_bid, mitigation),
            supply_pressure: finite_or(self.supply_pressure, 0.0),
            sentiment_effect: finite_or(self.sentiment_effect, 0.0),
            insurance_buffer: finite_or(self.insurance_buffer, 0.0),
            co_benefits: self.co_benefits.unwrap_or_default(),
            mrv_standard: text_or(self.mrv_standard, UNSPECIFIED_MRV),
            id,
        })
    }
}

/// A country row with its GDP.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryEntry {
    /// Country code.
    pub code: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// GDP in US dollars.
    #[serde(default, rename = "gdpUSD")]
    pub gdp_usd: f64,
}

/// The catalog file: projects, events and country GDP data.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CatalogFile {
    /// Project library.
    #[serde(default)]
    pub projects: Vec<RawProject>,
    /// Event library.
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    /// Country GDP table.
    #[serde(default)]
    pub countries: Vec<CountryEntry>,
}

impl CatalogFile {
    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, or
    /// [`CatalogError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a catalog from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, CatalogError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Normalize the file into a catalog and a GDP table.
    ///
    /// Projects without an id, events without an id, operations without a
    /// target, and countries with an invalid code are dropped with a warning.
    pub fn into_parts(self) -> (InMemoryCatalog, GdpTable) {
        let projects: Vec<Project> = self
            .projects
            .into_iter()
            .filter_map(|raw| {
                let normalized = raw.normalize();
                if normalized.is_none() {
                    warn!("Dropping catalog project without an id");
                }
                normalized
            })
            .collect();

        let events: Vec<EventDefinition> = self
            .events
            .into_iter()
            .filter(|event| {
                let keep = !event.id.trim().is_empty();
                if !keep {
                    warn!("Dropping catalog event without an id");
                }
                keep
            })
            .map(normalize_event)
            .collect();

        let mut gdp = GdpTable::new();
        for entry in self.countries {
            match CountryCode::parse(&entry.code) {
                Some(code) => gdp.insert(code, entry.gdp_usd),
                None => warn!(code = %entry.code, "Dropping catalog country with invalid code"),
            }
        }

        debug!(
            projects = projects.len(),
            events = events.len(),
            countries = gdp.len(),
            "Catalog loaded"
        );
        (InMemoryCatalog::new(projects, events), gdp)
    }
}

fn normalize_event(mut event: EventDefinition) -> EventDefinition {
    if event.title.trim().is_empty() {
        event.title.clone_from(&event.id);
    }
    event.operations.retain(|op| match op {
        EventOperation::Stat(stat) => !stat.target.trim().is_empty(),
        EventOperation::ProjectUpgrade(up) => !up.project_id.trim().is_empty(),
    });
    event
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::weighting::GdpSource;

    const SAMPLE: &str = r#"
projects:
  - id: dac
    name: Direct Air Capture
    co2eMitigation: 1000
    supplyPressure: 200
    sentimentEffect: 0.05
  - id: mangrove
    co2eMitigation: 400
    xcrBid: 350
    mrvStandard: Verra
  - name: nameless
events:
  - id: heatwave
    title: Heatwave
    justified: true
    operations:
      - type: stat
        target: sentiment
        operation: add
        value: -0.1
      - type: stat
        value: 3
  - id: breakthrough
    operations:
      - type: projectUpgrade
        projectId: dac
        xcrBidMultiplier: 0.9
countries:
  - code: USA
    gdpUSD: 28000000000000
  - code: "12"
    gdpUSD: 1
"#;

    fn sample() -> (InMemoryCatalog, GdpTable) {
        CatalogFile::parse(SAMPLE).unwrap().into_parts()
    }

    #[test]
    fn projects_are_normalized() {
        let (catalog, _) = sample();
        let projects = catalog.list_projects();
        assert_eq!(projects.len(), 2);
        let dac = catalog.project_by_id("dac").unwrap();
        assert!((dac.xcr_bid - 1000.0).abs() < f64::EPSILON);
        assert_eq!(dac.mrv_standard, UNSPECIFIED_MRV);
        let mangrove = catalog.project_by_id("mangrove").unwrap();
        assert_eq!(mangrove.name, "mangrove");
        assert!((mangrove.xcr_bid - 350.0).abs() < f64::EPSILON);
        assert_eq!(mangrove.mrv_standard, "Verra");
    }

    #[test]
    fn events_are_normalized() {
        let (catalog, _) = sample();
        let events = catalog.list_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].operations.len(), 1);
        assert_eq!(events[1].title, "breakthrough");
    }

    #[test]
    fn countries_feed_gdp_table() {
        let (_, gdp) = sample();
        assert_eq!(gdp.len(), 1);
        let usa = CountryCode::parse("USA").unwrap();
        assert!(gdp.gdp_of(&usa) > 0.0);
    }

    #[test]
    fn upgrade_rounds_and_persists() {
        let (mut catalog, _) = sample();
        let upgrade = ProjectUpgrade {
            project_id: "dac".to_owned(),
            xcr_bid_multiplier: 0.333,
            sentiment_effect_delta: 0.01,
            supply_multiplier: 0.0,
            ..ProjectUpgrade::default()
        };
        assert!(catalog.mutate_project(&upgrade));
        let dac = catalog.project_by_id("dac").unwrap();
        assert!((dac.xcr_bid - 333.0).abs() < f64::EPSILON);
        assert!((dac.sentiment_effect - 0.06).abs() < 1e-12);
        // zero multiplier is ignored
        assert!((dac.supply_pressure - 200.0).abs() < f64::EPSILON);
        assert!(!catalog.mutate_project(&ProjectUpgrade {
            project_id: "missing".to_owned(),
            ..ProjectUpgrade::default()
        }));
    }

    #[test]
    fn draws_are_bounded_and_distinct() {
        let (catalog, _) = sample();
        let mut rng = StdRng::seed_from_u64(42);
        let offers = draw_projects(&catalog, 5, &mut rng);
        assert_eq!(offers.len(), 2);
        assert_ne!(offers[0].id, offers[1].id);
        let one = draw_projects(&catalog, 1, &mut rng);
        assert_eq!(one.len(), 1);
        assert!(random_event(&catalog, &mut rng).is_some());
    }

    #[test]
    fn load_project_catalog_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("data")
            .join("catalog.yaml");
        if path.exists() {
            let (catalog, gdp) = CatalogFile::from_file(&path).unwrap().into_parts();
            assert!(!catalog.list_projects().is_empty());
            assert!(!catalog.list_events().is_empty());
            assert!(!gdp.is_empty());
            let microgrids = catalog.project_by_id("solar-microgrids").unwrap();
            assert!((microgrids.xcr_bid - microgrids.co2e_mitigation).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn empty_catalog_degrades() {
        let catalog = InMemoryCatalog::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(draw_projects(&catalog, 3, &mut rng).is_empty());
        assert!(random_event(&catalog, &mut rng).is_none());
    }
}
