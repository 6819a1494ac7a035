//! The reconciliation loop driving a harvest run.
//!
//! A [`HarvestPlan`] names the partitions to visit. [`Harvester::run`] walks
//! every partition × category × kind query in order, fetches one catalog page
//! per query and hands each entry to the [`AcquisitionPipeline`]. Entry
//! failures are recorded, never fatal; a failed page fetch only empties that
//! page.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::harvest::{HarvestPlan, Harvester};
//! use harvester_core::pipeline::{AcquisitionPipeline, HarvestState};
//!
//! # async fn example(pipeline: AcquisitionPipeline) -> Result<(), Box<dyn std::error::Error>> {
//! let plan = HarvestPlan::from_selection(Some(&["7".to_string()][..]), None)?;
//! let mut state = HarvestState::new("sibi_book_list.csv", "sibi_failures.csv");
//! state.load()?;
//!
//! let mut harvester = Harvester::new(pipeline, state);
//! let stats = harvester.run(&plan).await;
//! println!("acquired {} of {}", stats.acquired, stats.total());
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::catalog::{CatalogCategory, CatalogQuery, NONTEXT_LEVELS, Partition, TEXT_CLASSES};
use crate::model::AssetKind;
use crate::pipeline::{AcquisitionPipeline, EntryStatus, HarvestState};

/// Selection keyword expanding to every known class or level.
pub const ALL: &str = "all";

/// Errors building a [`HarvestPlan`].
#[derive(Debug, Error)]
pub enum PlanError {
    /// A class outside `1`..`12`.
    #[error("unknown class {0:?} (expected 1-12 or all)")]
    UnknownClass(String),

    /// A level outside the known non-text levels.
    #[error("unknown level {0:?} (expected one of A, B1, B2, B3, C, D, E, transisi or all)")]
    UnknownLevel(String),
}

/// The classes and levels a run visits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestPlan {
    classes: Vec<String>,
    levels: Vec<String>,
}

impl HarvestPlan {
    /// Plan covering every class and every level.
    #[must_use]
    pub fn all() -> Self {
        Self {
            classes: TEXT_CLASSES.iter().map(ToString::to_string).collect(),
            levels: NONTEXT_LEVELS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Builds a plan from the user's class and level selections.
    ///
    /// `all` in either list selects every value of that axis. With no
    /// selection at all, every class and level is visited; with only one
    /// selection, the other axis is skipped. Duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] for a class or level the catalog does not know.
    pub fn from_selection(
        classes: Option<&[String]>,
        levels: Option<&[String]>,
    ) -> Result<Self, PlanError> {
        if classes.is_none() && levels.is_none() {
            return Ok(Self::all());
        }

        let classes = expand(classes.unwrap_or_default(), &TEXT_CLASSES)
            .map_err(PlanError::UnknownClass)?;
        let levels = expand(levels.unwrap_or_default(), &NONTEXT_LEVELS)
            .map_err(PlanError::UnknownLevel)?;
        Ok(Self { classes, levels })
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Returns every catalog query of the plan, in visiting order.
    ///
    /// Each class is queried for curriculum and text books, as documents and
    /// as audio; each level is queried for non-text documents.
    #[must_use]
    pub fn queries(&self) -> Vec<CatalogQuery> {
        let mut queries = Vec::new();
        for class in &self.classes {
            for category in [CatalogCategory::Curriculum, CatalogCategory::Text] {
                for kind in [AssetKind::Document, AssetKind::Audio] {
                    queries.push(CatalogQuery::new(
                        Partition::Class(class.clone()),
                        category,
                        kind,
                    ));
                }
            }
        }
        for level in &self.levels {
            queries.push(CatalogQuery::new(
                Partition::Level(level.clone()),
                CatalogCategory::NonText,
                AssetKind::Document,
            ));
        }
        queries
    }
}

fn expand(selected: &[String], known: &[&str]) -> Result<Vec<String>, String> {
    if selected.iter().any(|value| value.eq_ignore_ascii_case(ALL)) {
        return Ok(known.iter().map(ToString::to_string).collect());
    }

    let mut values: Vec<String> = Vec::new();
    for value in selected {
        let canonical = known
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| value.clone())?;
        if !values.iter().any(|existing| existing == canonical) {
            values.push((*canonical).to_string());
        }
    }
    Ok(values)
}

/// Counters for one harvest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Entries fully acquired this run.
    pub acquired: usize,
    /// Entries already acquired earlier, or already seen this run.
    pub skipped: usize,
    /// Entries that failed outright.
    pub failed: usize,
    /// Audio books with some attachments still failing.
    pub partial: usize,
    /// Catalog pages that could not be fetched.
    pub pages_degraded: usize,
}

impl HarvestStats {
    /// Returns the number of entries visited.
    #[must_use]
    pub fn total(&self) -> usize {
        self.acquired + self.skipped + self.failed + self.partial
    }

    fn count(&mut self, status: EntryStatus) {
        match status {
            EntryStatus::Skipped => self.skipped += 1,
            EntryStatus::Acquired => self.acquired += 1,
            EntryStatus::Partial => self.partial += 1,
            EntryStatus::Failed => self.failed += 1,
        }
    }
}

/// Owns the persisted state for a run and drives the pipeline over it.
#[derive(Debug)]
pub struct Harvester {
    pipeline: AcquisitionPipeline,
    state: HarvestState,
}

impl Harvester {
    /// Creates a harvester over already loaded `state`.
    #[must_use]
    pub fn new(pipeline: AcquisitionPipeline, state: HarvestState) -> Self {
        Self { pipeline, state }
    }

    #[must_use]
    pub fn state(&self) -> &HarvestState {
        &self.state
    }

    /// Consumes the harvester, returning its state.
    #[must_use]
    pub fn into_state(self) -> HarvestState {
        self.state
    }

    /// Visits every query of `plan` and processes each entry once.
    ///
    /// State is checkpointed after every processed entry and once more at
    /// the end, so the tables exist even when nothing was acquired.
    #[instrument(skip(self, plan), fields(classes = plan.classes.len(), levels = plan.levels.len()))]
    pub async fn run(&mut self, plan: &HarvestPlan) -> HarvestStats {
        let mut stats = HarvestStats::default();
        let mut seen: HashSet<(String, AssetKind)> = HashSet::new();

        info!("starting harvest");
        for query in plan.queries() {
            let page = self.pipeline.source().fetch(&query).await;
            if page.degraded {
                warn!(query = %query, "catalog page unavailable; skipping partition");
                stats.pages_degraded += 1;
                continue;
            }

            for entry in &page.results {
                if entry.title.trim().is_empty() {
                    warn!(query = %query, "ignoring catalog entry without a title");
                    continue;
                }
                if !seen.insert((entry.title.clone(), entry.kind)) {
                    stats.skipped += 1;
                    continue;
                }
                let status = self.pipeline.process(entry, &mut self.state).await;
                stats.count(status);
            }
        }

        if let Err(err) = self.state.checkpoint() {
            error!(error = %err, "final checkpoint failed");
        }

        info!(
            acquired = stats.acquired,
            skipped = stats.skipped,
            failed = stats.failed,
            partial = stats.partial,
            pages_degraded = stats.pages_degraded,
            paused_secs = self.pipeline.pacer().paused_total().as_secs(),
            "harvest complete"
        );
        stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_no_selection_means_everything() {
        let plan = HarvestPlan::from_selection(None, None).unwrap();
        assert_eq!(plan, HarvestPlan::all());
        assert_eq!(plan.classes().len(), 12);
        assert_eq!(plan.levels().len(), 8);
    }

    #[test]
    fn test_single_selection_skips_other_axis() {
        let classes = strings(&["7", "8"]);
        let plan = HarvestPlan::from_selection(Some(classes.as_slice()), None).unwrap();
        assert_eq!(plan.classes(), ["7", "8"]);
        assert!(plan.levels().is_empty());

        let levels = strings(&["b1"]);
        let plan = HarvestPlan::from_selection(None, Some(levels.as_slice())).unwrap();
        assert!(plan.classes().is_empty());
        assert_eq!(plan.levels(), ["B1"]);
    }

    #[test]
    fn test_all_keyword_expands() {
        let levels = strings(&["all"]);
        let plan = HarvestPlan::from_selection(Some(&[][..]), Some(levels.as_slice())).unwrap();
        assert!(plan.classes().is_empty());
        assert_eq!(plan.levels().len(), NONTEXT_LEVELS.len());
    }

    #[test]
    fn test_unknown_values_rejected() {
        let classes = strings(&["13"]);
        let result = HarvestPlan::from_selection(Some(classes.as_slice()), None);
        assert!(matches!(result, Err(PlanError::UnknownClass(ref c)) if c == "13"));

        let levels = strings(&["Z"]);
        let result = HarvestPlan::from_selection(None, Some(levels.as_slice()));
        assert!(matches!(result, Err(PlanError::UnknownLevel(_))));
    }

    #[test]
    fn test_duplicates_dropped() {
        let classes = strings(&["3", "3", "4"]);
        let plan = HarvestPlan::from_selection(Some(classes.as_slice()), None).unwrap();
        assert_eq!(plan.classes(), ["3", "4"]);
    }

    #[test]
    fn test_queries_cover_categories_and_kinds() {
        let classes = strings(&["5"]);
        let levels = strings(&["C"]);
        let plan = HarvestPlan::from_selection(Some(classes.as_slice()), Some(levels.as_slice())).unwrap();
        let queries = plan.queries();

        assert_eq!(queries.len(), 5);
        assert_eq!(queries[0].category, CatalogCategory::Curriculum);
        assert_eq!(queries[0].kind, AssetKind::Document);
        assert_eq!(queries[1].kind, AssetKind::Audio);
        assert_eq!(queries[2].category, CatalogCategory::Text);
        assert_eq!(
            queries[4],
            CatalogQuery::new(
                Partition::Level("C".into()),
                CatalogCategory::NonText,
                AssetKind::Document
            )
        );
    }

    #[test]
    fn test_stats_total() {
        let mut stats = HarvestStats::default();
        stats.count(EntryStatus::Acquired);
        stats.count(EntryStatus::Skipped);
        stats.count(EntryStatus::Failed);
        stats.count(EntryStatus::Partial);
        assert_eq!(stats.total(), 4);
    }
}
