use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use weekly_journal_schemas::{
    today, week_range_of, week_range_of_str, JournalEntry, WeekBucket, WeekRange, WeeklySummary,
};
use weekly_journal_store::{EntryStore, StoreError, SummaryStore};

use crate::llm_providers::SummaryGenerator;
use crate::templates::PromptRenderer;

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Nothing to summarize; the generator was not called.
    #[error("No entries found for the specified week ({week_start}..{week_end})")]
    NoEntries { week_start: String, week_end: String },

    /// The generator failed, timed out or returned nothing usable.
    #[error("summary generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Generation succeeded but the save did not; `summary` is the generated text.
    #[error("summary was generated but could not be saved: {source}")]
    PersistFailed { summary: String, source: StoreError },
}

impl PipelineError {
    /// Generated text that survived a failed save, if any
    pub fn generated_summary(&self) -> Option<&str> {
        match self {
            PipelineError::PersistFailed { summary, .. } => Some(summary),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Builds weekly summaries: fetch entries, render prompt, generate, optionally persist.
///
/// Holds no per-request state. The store lock is only taken around store calls,
/// never across the generator call.
pub struct SummaryPipeline<S> {
    store: Arc<Mutex<S>>,
    generator: Arc<dyn SummaryGenerator>,
    renderer: PromptRenderer,
    generation_timeout: Duration,
}

impl<S> Clone for SummaryPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            renderer: PromptRenderer::new(),
            generation_timeout: self.generation_timeout,
        }
    }
}

impl<S> SummaryPipeline<S>
where
    S: EntryStore + SummaryStore,
{
    pub fn new(store: Arc<Mutex<S>>, generator: Arc<dyn SummaryGenerator>) -> Self {
        Self {
            store,
            generator,
            renderer: PromptRenderer::new(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    /// Generate summary text for the entries in `week_start..=week_end`
    pub async fn compose_summary(&self, week_start: &str, week_end: &str) -> Result<String> {
        debug!("Fetching entries for {}..{}", week_start, week_end);

        let entries = {
            let store = self.store.lock().await;
            store.list_entries_in_range(week_start, week_end)?
        };

        if entries.is_empty() {
            warn!("No entries for {}..{}, skipping generation", week_start, week_end);
            return Err(PipelineError::NoEntries {
                week_start: week_start.to_string(),
                week_end: week_end.to_string(),
            });
        }

        let prompt = self.renderer.render(&entries);

        info!(
            "Generating summary for {}..{} from {} entries via {}",
            week_start,
            week_end,
            entries.len(),
            self.generator.name()
        );

        let generated =
            match tokio::time::timeout(self.generation_timeout, self.generator.generate(&prompt))
                .await
            {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => return Err(PipelineError::Generation(format!("{:#}", e))),
                Err(_) => {
                    return Err(PipelineError::Generation(format!(
                        "{} did not respond within {:?}",
                        self.generator.name(),
                        self.generation_timeout
                    )))
                }
            };

        let summary = generated.trim();
        if summary.is_empty() {
            return Err(PipelineError::Generation(
                "generator returned an empty summary".to_string(),
            ));
        }

        debug!("Generated {} chars for {}..{}", summary.len(), week_start, week_end);
        Ok(summary.to_string())
    }

    /// Generate and append a summary for the week. A failed save keeps the text.
    pub async fn compose_and_save_summary(
        &self,
        week_start: &str,
        week_end: &str,
    ) -> Result<WeeklySummary> {
        let summary = self.compose_summary(week_start, week_end).await?;

        debug!("Persisting summary for {}..{}", week_start, week_end);

        let store = self.store.lock().await;
        match store.save_summary(week_start, week_end, &summary) {
            Ok(saved) => Ok(saved),
            Err(source) => Err(PipelineError::PersistFailed { summary, source }),
        }
    }

    /// Entries of the Monday-Sunday week containing today
    pub async fn current_week_entries(&self) -> Result<Vec<JournalEntry>> {
        self.entries_for_week_of(today()).await
    }

    pub async fn entries_for_week_of(&self, date: NaiveDate) -> Result<Vec<JournalEntry>> {
        let week = week_range_of(date).map_err(StoreError::from)?;

        let store = self.store.lock().await;
        Ok(store.list_entries_in_range(&week.start, &week.end)?)
    }

    /// Every week that has entries or summaries, newest week first
    pub async fn weekly_overview(&self) -> Result<Vec<WeekBucket>> {
        let (entries, summaries) = {
            let store = self.store.lock().await;
            (store.list_entries()?, store.list_summaries()?)
        };

        let mut buckets: BTreeMap<String, WeekBucket> = BTreeMap::new();

        for entry in entries {
            let week = match week_range_of_str(&entry.date) {
                Ok(week) => week,
                Err(e) => {
                    warn!("Skipping entry {} in week overview: {}", entry.id, e);
                    continue;
                }
            };

            bucket_for(&mut buckets, week).entries.push(entry);
        }

        for summary in summaries {
            // Only summaries saved for an actual Monday-Sunday week have a bucket
            match week_range_of_str(&summary.week_start) {
                Ok(week) if summary.covers(&week) => {
                    bucket_for(&mut buckets, week).summaries.push(summary)
                }
                _ => debug!("Summary {} does not cover a calendar week", summary.id),
            }
        }

        let mut overview: Vec<WeekBucket> = buckets.into_values().rev().collect();
        for bucket in &mut overview {
            bucket
                .entries
                .sort_by(|a, b| a.date.cmp(&b.date).then(a.id.0.cmp(&b.id.0)));
        }

        Ok(overview)
    }
}

fn bucket_for(buckets: &mut BTreeMap<String, WeekBucket>, week: WeekRange) -> &mut WeekBucket {
    buckets
        .entry(week.start.clone())
        .or_insert_with(|| WeekBucket {
            week,
            entries: Vec::new(),
            summaries: Vec::new(),
        })
}
