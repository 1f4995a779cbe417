//! Evaluation of all configured metric definitions for one request.
//!
//! Export is best effort: a definition that fails to resolve, render, execute
//! or map is logged and contributes nothing, while the remaining definitions
//! are still evaluated.

use std::{sync::Arc, time::Instant};
use tracing::{debug, error};

use crate::{
    database,
    influx::QueryExecutor,
    mapper,
    metrics::{observe_query, record_metric_failure, record_metric_success},
    models::{Metric, MetricDefinition},
    template,
    window::TimeWindow,
    Result,
};

pub struct Exporter {
    executor: Arc<dyn QueryExecutor>,
    metrics: Vec<MetricDefinition>,
    derive_database_from_query: bool,
}

impl Exporter {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        metrics: Vec<MetricDefinition>,
        derive_database_from_query: bool,
    ) -> Self {
        Self {
            executor,
            metrics,
            derive_database_from_query,
        }
    }

    pub fn definitions(&self) -> &[MetricDefinition] {
        &self.metrics
    }

    /// Evaluates every definition in configuration order and concatenates the results.
    pub async fn export(&self, window: &TimeWindow) -> Vec<Metric> {
        let mut exported = Vec::new();

        for metric in &self.metrics {
            match self.query_metric(metric, window).await {
                Ok(metrics) => {
                    record_metric_success();
                    exported.extend(metrics);
                }
                Err(e) => {
                    record_metric_failure();
                    error!(metric = %metric.name, error = %e, "Error fetching data");
                }
            }
        }

        exported
    }

    async fn query_metric(&self, metric: &MetricDefinition, window: &TimeWindow) -> Result<Vec<Metric>> {
        let database = database::resolve_database(metric, self.derive_database_from_query)?;
        let query = template::render_query(&metric.query, &window.extended())?;

        let started = Instant::now();
        let result = self.executor.execute(&query, &database).await;
        observe_query(&database, started.elapsed().as_secs_f64());

        let metrics = mapper::map_result(&result?, metric, window)?;
        debug!(metric = %metric.name, series = metrics.len(), "Mapped query result");
        Ok(metrics)
    }
}
