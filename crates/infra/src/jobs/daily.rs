use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use charops_core::{DomainError, SiteId};
use charops_records::item::field;
use charops_records::Table;

use crate::projections::{Forecast, ProjectionError, SupplyDemandProjector};
use crate::record_source::{RecordSource, RecordSourceError};
use crate::site::{CollectionPath, Site};
use crate::warnings::WarningScheduler;

#[derive(Debug, thiserror::Error)]
pub enum DailyRunError {
    #[error("invalid site id: {0}")]
    InvalidSite(#[from] DomainError),

    #[error(transparent)]
    Source(#[from] RecordSourceError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Merge-write `supplyForecast` / `demandForecast` onto every registered item.
///
/// Call only with a complete forecast; a failed projection must not leave
/// partial figures behind.
pub async fn persist_forecasts<S>(
    source: &S,
    site: &Site,
    forecast: &Forecast,
) -> Result<usize, RecordSourceError>
where
    S: RecordSource + ?Sized,
{
    if forecast.supply.is_empty() {
        warn!(site = %site, "no registered inventory items; nothing to persist");
        return Ok(0);
    }
    let collection = site.collection(Table::Inventory);
    let mut written = 0;
    for (item, supply) in forecast.supply.iter() {
        let demand = forecast.demand.get(item).unwrap_or_default();
        let mut fields = Map::new();
        fields.insert(field::SUPPLY_FORECAST.to_string(), JsonValue::from(supply));
        fields.insert(field::DEMAND_FORECAST.to_string(), JsonValue::from(demand));
        source.update(&collection, item.as_str(), fields).await?;
        written += 1;
    }
    Ok(written)
}

/// Outcome of one site's daily run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteRun {
    pub site: SiteId,
    pub items_written: usize,
    pub warnings: usize,
    pub failed_deliveries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteFailure {
    pub site: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub run_id: Uuid,
    pub at: DateTime<Utc>,
    pub completed: Vec<SiteRun>,
    pub failed: Vec<SiteFailure>,
}

impl DailyReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs every registered site: project, persist, then evaluate warnings.
///
/// Sites run concurrently and share nothing; one site failing is logged and
/// reported without affecting the others.
pub struct DailyJob<S: ?Sized> {
    source: Arc<S>,
    projector: SupplyDemandProjector,
    warnings: WarningScheduler,
}

impl<S: ?Sized> Clone for DailyJob<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            projector: self.projector.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

impl<S> DailyJob<S>
where
    S: RecordSource + ?Sized + 'static,
{
    pub fn new(
        source: Arc<S>,
        projector: SupplyDemandProjector,
        warnings: WarningScheduler,
    ) -> Self {
        Self {
            source,
            projector,
            warnings,
        }
    }

    /// Sites registered in the global `sites` collection.
    pub async fn sites(&self) -> Result<Vec<Site>, DailyRunError> {
        let ids = self.source.list_ids(&CollectionPath::global(Table::Sites)).await?;
        ids.iter()
            .map(|id| -> Result<Site, DailyRunError> { Ok(Site::new(id.parse::<SiteId>()?)) })
            .collect()
    }

    /// Project, persist and warn for a single site.
    pub async fn run_site(
        &self,
        site: &Site,
        now: DateTime<Utc>,
    ) -> Result<SiteRun, DailyRunError> {
        let source = self.source.as_ref();
        let forecast = self.projector.project(source, site, now).await?;
        let items_written = persist_forecasts(source, site, &forecast).await?;

        let dispatch = self.warnings.evaluate(source, site, now).await?;
        let warnings = dispatch.warnings.len();
        let failed_deliveries = dispatch.settle().await;

        Ok(SiteRun {
            site: site.id().clone(),
            items_written,
            warnings,
            failed_deliveries,
        })
    }

    pub async fn run_daily(&self, now: DateTime<Utc>) -> Result<DailyReport, DailyRunError> {
        let run_id = Uuid::now_v7();
        let sites = self.sites().await?;
        info!(run = %run_id, sites = sites.len(), "daily run started");

        let mut runs = JoinSet::new();
        for site in sites {
            let job = self.clone();
            let span = info_span!("site_run", run = %run_id, site = %site);
            runs.spawn(
                async move {
                    let result = job.run_site(&site, now).await;
                    (site, result)
                }
                .instrument(span),
            );
        }

        let mut report = DailyReport {
            run_id,
            at: now,
            completed: Vec::new(),
            failed: Vec::new(),
        };
        while let Some(joined) = runs.join_next().await {
            match joined {
                Ok((_, Ok(run))) => {
                    info!(
                        run = %run_id,
                        site = %run.site,
                        items = run.items_written,
                        warnings = run.warnings,
                        "site run completed"
                    );
                    report.completed.push(run);
                }
                Ok((site, Err(e))) => {
                    error!(run = %run_id, site = %site, error = %e, "site run failed");
                    report.failed.push(SiteFailure {
                        site: site.id().to_string(),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!(run = %run_id, error = %e, "site run task aborted");
                    report.failed.push(SiteFailure {
                        site: "unknown".to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.completed.sort_by(|a, b| a.site.cmp(&b.site));
        report.failed.sort_by(|a, b| a.site.cmp(&b.site));
        info!(
            run = %run_id,
            completed = report.completed.len(),
            failed = report.failed.len(),
            "daily run finished"
        );
        Ok(report)
    }
}
