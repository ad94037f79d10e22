// Copyright 2026 foyer Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::{BoxedCounter, BoxedGauge, BoxedHistogram, RegistryOps};

/// Metrics of a dictionary manager.
#[derive(Debug)]
#[expect(missing_docs)]
pub struct Metrics {
    /* dictionary operations */
    pub dictionary_insert: BoxedCounter,
    pub dictionary_replace: BoxedCounter,
    pub dictionary_discard: BoxedCounter,
    pub dictionary_hit: BoxedCounter,
    pub dictionary_miss: BoxedCounter,
    pub dictionary_evict: BoxedCounter,
    pub dictionary_remove: BoxedCounter,

    pub dictionary_usage_bytes: BoxedGauge,
    pub dictionary_usage_count: BoxedGauge,

    /* admission */
    pub admission_accept: BoxedCounter,
    pub admission_reject: BoxedCounter,

    /* payload disk io */
    pub disk_write: BoxedCounter,
    pub disk_read: BoxedCounter,
    pub disk_read_failure: BoxedCounter,

    pub disk_write_bytes: BoxedCounter,
    pub disk_read_bytes: BoxedCounter,

    pub disk_read_duration: BoxedHistogram,
}

impl Metrics {
    /// Create a new metric with the given name.
    pub fn new(name: &'static str, registry: &dyn RegistryOps) -> Self {
        let dictcache_dictionary_op_total = registry.register_counter_vec(
            "dictcache_dictionary_op_total",
            "dictcache dictionary operations",
            &["name", "op"],
        );
        let dictcache_dictionary_usage = registry.register_gauge_vec(
            "dictcache_dictionary_usage",
            "dictcache dictionary usage",
            &["name", "unit"],
        );

        let dictionary_insert = dictcache_dictionary_op_total.counter(&[name, "insert"]);
        let dictionary_replace = dictcache_dictionary_op_total.counter(&[name, "replace"]);
        let dictionary_discard = dictcache_dictionary_op_total.counter(&[name, "discard"]);
        let dictionary_hit = dictcache_dictionary_op_total.counter(&[name, "hit"]);
        let dictionary_miss = dictcache_dictionary_op_total.counter(&[name, "miss"]);
        let dictionary_evict = dictcache_dictionary_op_total.counter(&[name, "evict"]);
        let dictionary_remove = dictcache_dictionary_op_total.counter(&[name, "remove"]);

        let dictionary_usage_bytes = dictcache_dictionary_usage.gauge(&[name, "bytes"]);
        let dictionary_usage_count = dictcache_dictionary_usage.gauge(&[name, "count"]);

        let dictcache_admission_total = registry.register_counter_vec(
            "dictcache_admission_total",
            "dictcache dictionary admission decisions",
            &["name", "decision"],
        );

        let admission_accept = dictcache_admission_total.counter(&[name, "accept"]);
        let admission_reject = dictcache_admission_total.counter(&[name, "reject"]);

        let dictcache_disk_io_total =
            registry.register_counter_vec("dictcache_disk_io_total", "dictcache payload disk io", &["name", "op"]);
        let dictcache_disk_io_bytes = registry.register_counter_vec(
            "dictcache_disk_io_bytes",
            "dictcache payload disk io bytes",
            &["name", "op"],
        );
        let dictcache_disk_io_duration = registry.register_histogram_vec(
            "dictcache_disk_io_duration",
            "dictcache payload disk io durations",
            &["name", "op"],
        );

        let disk_write = dictcache_disk_io_total.counter(&[name, "write"]);
        let disk_read = dictcache_disk_io_total.counter(&[name, "read"]);
        let disk_read_failure = dictcache_disk_io_total.counter(&[name, "read_failure"]);

        let disk_write_bytes = dictcache_disk_io_bytes.counter(&[name, "write"]);
        let disk_read_bytes = dictcache_disk_io_bytes.counter(&[name, "read"]);

        let disk_read_duration = dictcache_disk_io_duration.histogram(&[name, "read"]);

        Self {
            dictionary_insert,
            dictionary_replace,
            dictionary_discard,
            dictionary_hit,
            dictionary_miss,
            dictionary_evict,
            dictionary_remove,
            dictionary_usage_bytes,
            dictionary_usage_count,
            admission_accept,
            admission_reject,
            disk_write,
            disk_read,
            disk_read_failure,
            disk_write_bytes,
            disk_read_bytes,
            disk_read_duration,
        }
    }

    /// Build noop metrics.
    ///
    /// Note: `noop` is only supposed to be called by other dictcache components.
    #[doc(hidden)]
    pub fn noop() -> Self {
        use super::registry::noop::NoopMetricsRegistry;

        Self::new("test", &NoopMetricsRegistry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::registry::noop::NoopMetricsRegistry;

    fn case(registry: &dyn RegistryOps) {
        let metrics = Metrics::new("test", registry);
        metrics.dictionary_insert.increase(1);
        metrics.dictionary_usage_bytes.absolute(11);
        metrics.disk_read_duration.record(0.001);
    }

    #[test]
    fn test_metrics_noop() {
        case(&NoopMetricsRegistry);
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn test_metrics_prometheus() {
        use crate::metrics::registry::prometheus::PrometheusMetricsRegistry;

        case(&PrometheusMetricsRegistry::new(prometheus::Registry::new()));
    }
}
