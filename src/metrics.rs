//! Metrics collection and export for object pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use litepool::{ObjectPool, PoolConfiguration};
///
/// let pool = ObjectPool::new(|| 0u8, PoolConfiguration::new().with_capacity(3)).unwrap();
///
/// {
///     let _obj = pool.acquire().unwrap();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.total_acquired, 1);
///     assert_eq!(metrics.in_use_objects, 1);
/// }
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Successful acquisitions
    pub total_acquired: usize,

    /// Successful releases, kept or evicted
    pub total_released: usize,

    /// Objects produced by the factory
    pub total_created: usize,

    /// Objects evicted for any reason
    pub total_evicted: usize,

    /// Objects rejected by the acquisition hook
    pub hook_rejections: usize,

    /// Acquisitions that failed with no available items
    pub exhausted_events: usize,

    /// Currently checked out
    pub in_use_objects: usize,

    /// Currently idle in the pool
    pub available_objects: usize,

    /// Ratio of checked out objects to capacity (0.0 to 1.0)
    pub utilization: f64,

    pub capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("total_evicted".to_string(), self.total_evicted.to_string());
        metrics.insert("hook_rejections".to_string(), self.hook_rejections.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("in_use_objects".to_string(), self.in_use_objects.to_string());
        metrics.insert("available_objects".to_string(), self.available_objects.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("capacity".to_string(), self.capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use litepool::{ObjectPool, PoolConfiguration};
    /// use std::collections::HashMap;
    ///
    /// let pool = ObjectPool::new(|| 0u8, PoolConfiguration::default()).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags));
    /// assert!(output.contains("litepool_objects_in_use"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let labels = Self::format_labels(pool_name, tags);
        let mut output = String::new();

        let gauges = [
            ("litepool_objects_in_use", "Objects currently checked out", metrics.in_use_objects.to_string()),
            ("litepool_objects_available", "Objects currently idle", metrics.available_objects.to_string()),
            ("litepool_capacity", "Maximum pool size", metrics.capacity.to_string()),
            ("litepool_utilization", "Pool utilization ratio", format!("{:.2}", metrics.utilization)),
        ];
        for (name, help, value) in gauges {
            Self::push_metric(&mut output, name, help, "gauge", &labels, &value);
        }

        let counters = [
            ("litepool_acquired_total", "Total successful acquisitions", metrics.total_acquired),
            ("litepool_released_total", "Total releases", metrics.total_released),
            ("litepool_created_total", "Total objects created", metrics.total_created),
            ("litepool_evicted_total", "Total objects evicted", metrics.total_evicted),
            ("litepool_hook_rejections_total", "Objects rejected by the acquisition hook", metrics.hook_rejections),
            ("litepool_exhausted_total", "Acquisitions failed for lack of capacity", metrics.exhausted_events),
        ];
        for (name, help, value) in counters {
            Self::push_metric(&mut output, name, help, "counter", &labels, &value.to_string());
        }

        output
    }

    fn push_metric(output: &mut String, name: &str, help: &str, kind: &str, labels: &str, value: &str) {
        output.push_str(&format!("# HELP {name} {help}\n"));
        output.push_str(&format!("# TYPE {name} {kind}\n"));
        output.push_str(&format!("{name}{{{labels}}} {value}\n"));
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", escape_label(pool_name))];

        if let Some(tags) = tags {
            let mut sorted: Vec<_> = tags.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                labels.push(format!("{}=\"{}\"", key, escape_label(value)));
            }
        }

        labels.join(",")
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub total_created: AtomicUsize,
    pub total_evicted: AtomicUsize,
    pub hook_rejections: AtomicUsize,
    pub exhausted_events: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, in_use: usize, available: usize, capacity: usize) -> PoolMetrics {
        let utilization = if capacity > 0 {
            (in_use as f64 / capacity as f64).min(1.0)
        } else {
            0.0
        };

        PoolMetrics {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_evicted: self.total_evicted.load(Ordering::Relaxed),
            hook_rejections: self.hook_rejections.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
            in_use_objects: in_use,
            available_objects: available,
            utilization,
            capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let tracker = MetricsTracker::new();
        MetricsTracker::record(&tracker.total_acquired);
        MetricsTracker::record(&tracker.total_acquired);
        MetricsTracker::record(&tracker.total_evicted);

        let metrics = tracker.get_metrics(2, 3, 4);
        assert_eq!(metrics.total_acquired, 2);
        assert_eq!(metrics.total_evicted, 1);
        assert_eq!(metrics.utilization, 0.5);
        assert_eq!(metrics.export()["utilization"], "0.50");
    }

    #[test]
    fn test_utilization_after_shrink_is_capped() {
        let metrics = MetricsTracker::new().get_metrics(8, 0, 4);
        assert_eq!(metrics.utilization, 1.0);
    }

    #[test]
    fn test_prometheus_labels() {
        let metrics = MetricsTracker::new().get_metrics(1, 1, 2);
        let mut tags = HashMap::new();
        tags.insert("zone".to_string(), "a\"b".to_string());

        let output = MetricsExporter::export_prometheus(&metrics, "db", Some(&tags));
        assert!(output.contains("# TYPE litepool_acquired_total counter"));
        assert!(output.contains("litepool_objects_in_use{pool=\"db\",zone=\"a\\\"b\"} 1"));
    }
}
