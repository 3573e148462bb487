//! Time-window warnings over open orders.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use charops_core::{days, days_between};
use charops_records::order::field;
use charops_records::{Order, OrderStatus};

use crate::config::ForecastConfig;
use crate::record_source::{timestamp, Filter, RecordSource, RecordSourceError, SiteRecords};
use crate::site::Site;

use super::notifier::{Notification, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Activated order due soon that has not started activation.
    ActivationNeeded,
    /// Non-activated order due soon and still not started.
    CompletionReminder,
    /// Activation started long enough ago to be finished.
    ActivationFinished,
    /// In-progress order due soon.
    DeliveryApproaching,
}

impl WarningKind {
    pub const ALL: [WarningKind; 4] = [
        WarningKind::ActivationNeeded,
        WarningKind::CompletionReminder,
        WarningKind::ActivationFinished,
        WarningKind::DeliveryApproaching,
    ];

    /// Activation flag an order must carry, checked on the decoded order.
    ///
    /// A missing `isActivated` decodes as `false`, which a store predicate
    /// on the field would never match.
    fn activation(&self) -> Option<bool> {
        match self {
            WarningKind::ActivationNeeded | WarningKind::ActivationFinished => Some(true),
            WarningKind::CompletionReminder => Some(false),
            WarningKind::DeliveryApproaching => None,
        }
    }

    fn filter(&self, config: &ForecastConfig, now: DateTime<Utc>) -> Filter {
        let due_soon = timestamp(now + days(config.delivery_warning_days));
        match self {
            WarningKind::ActivationNeeded => Filter::all()
                .lt(
                    field::DELIVERY_DATE,
                    timestamp(now + days(config.activation_warning_days)),
                )
                .eq(field::STATUS, OrderStatus::Received.as_str()),
            WarningKind::CompletionReminder => Filter::all()
                .lt(field::DELIVERY_DATE, due_soon)
                .eq(field::STATUS, OrderStatus::Received.as_str()),
            WarningKind::ActivationFinished => Filter::all()
                .lt(
                    field::ACTIVATION_DATE,
                    timestamp(now - days(config.activation_duration_days)),
                )
                .eq(field::STATUS, OrderStatus::InProgress.as_str()),
            WarningKind::DeliveryApproaching => Filter::all()
                .lt(field::DELIVERY_DATE, due_soon)
                .eq(field::STATUS, OrderStatus::InProgress.as_str()),
        }
    }

    fn render(&self, order: &Order, now: DateTime<Utc>) -> (String, String) {
        let label = order.label();
        let customer = order.customer_name();
        let due = order.delivery_date.format("%Y-%m-%d");
        match self {
            WarningKind::ActivationNeeded => (
                format!("Order {label} needs to begin activation"),
                format!(
                    "order {label} for {customer} is due in {} days ({due}) \
                     and activation has not started.",
                    days_between(order.delivery_date, now)
                ),
            ),
            WarningKind::CompletionReminder => (
                format!("Order {label} completion reminder"),
                format!("order {label} for {customer} is due on {due} and has not been started."),
            ),
            WarningKind::ActivationFinished => {
                let since = order
                    .activation_date
                    .map(|started| days_between(now, started).to_string())
                    .unwrap_or_else(|| "?".to_string());
                (
                    format!("Order {label} has finished activating"),
                    format!(
                        "order {label} for {customer} started activating {since} days ago \
                         and should be finished."
                    ),
                )
            }
            WarningKind::DeliveryApproaching => (
                format!("Order {label} delivery date approaching"),
                format!("order {label} for {customer} is due on {due} and is still in progress."),
            ),
        }
    }
}

/// A warning raised for one order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub order: String,
    pub notification: Notification,
}

/// Warnings raised by one evaluation, with their deliveries in flight.
#[derive(Debug)]
pub struct WarningDispatch {
    pub warnings: Vec<Warning>,
    /// Orders matching a predicate but carrying no assignee.
    pub unassigned: Vec<String>,
    deliveries: JoinSet<bool>,
}

impl WarningDispatch {
    /// Wait for every delivery; returns how many failed.
    ///
    /// Dropping the dispatch instead leaves deliveries running.
    pub async fn settle(mut self) -> usize {
        let mut failed = 0;
        while let Some(delivered) = self.deliveries.join_next().await {
            if !matches!(delivered, Ok(true)) {
                failed += 1;
            }
        }
        failed
    }
}

/// Evaluates the warning predicates for a site and notifies assignees.
#[derive(Clone)]
pub struct WarningScheduler {
    config: ForecastConfig,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for WarningScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarningScheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WarningScheduler {
    pub fn new(config: ForecastConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self { config, notifier }
    }

    /// Evaluate all four predicates and dispatch one notification per match.
    ///
    /// An order matching several predicates is notified once per predicate.
    /// Notification failures are logged and never fail the evaluation.
    pub async fn evaluate<S>(
        &self,
        source: &S,
        site: &Site,
        now: DateTime<Utc>,
    ) -> Result<WarningDispatch, RecordSourceError>
    where
        S: RecordSource + ?Sized,
    {
        let records = SiteRecords::new(source, site);
        let [needed, reminder, finished, approaching] =
            WarningKind::ALL.map(|k| k.filter(&self.config, now));

        let groups = tokio::try_join!(
            records.fetch::<Order>(&needed),
            records.fetch::<Order>(&reminder),
            records.fetch::<Order>(&finished),
            records.fetch::<Order>(&approaching),
        )?;
        let groups = [groups.0, groups.1, groups.2, groups.3];

        let mut dispatch = WarningDispatch {
            warnings: Vec::new(),
            unassigned: Vec::new(),
            deliveries: JoinSet::new(),
        };

        for (kind, orders) in WarningKind::ALL.into_iter().zip(groups) {
            let matching = orders
                .into_iter()
                .filter(|order| kind.activation().is_none_or(|flag| flag == order.is_activated));
            for order in matching {
                let Some(assignee) = order.assignee.as_deref().filter(|a| !a.is_empty()) else {
                    warn!(
                        site = %site,
                        order = %order.label(),
                        kind = ?kind,
                        "order has no assignee; warning not sent"
                    );
                    dispatch.unassigned.push(order.label().to_string());
                    continue;
                };

                let (title, body) = kind.render(&order, now);
                let notification = Notification::new(assignee, title, body);

                let notifier = Arc::clone(&self.notifier);
                let outgoing = notification.clone();
                let site_id = site.id().clone();
                let order_label = order.label().to_string();
                dispatch.deliveries.spawn(async move {
                    match notifier.notify(&outgoing).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(
                                site = %site_id,
                                order = %order_label,
                                error = %e,
                                "failed to deliver warning"
                            );
                            false
                        }
                    }
                });

                dispatch.warnings.push(Warning {
                    kind,
                    order: order.label().to_string(),
                    notification,
                });
            }
        }

        info!(
            site = %site,
            warnings = dispatch.warnings.len(),
            unassigned = dispatch.unassigned.len(),
            "warnings evaluated"
        );

        Ok(dispatch)
    }
}
