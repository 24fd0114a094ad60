//! Canonical metric names
//!
//! Every metric and event sent through the service is named
//! `namespace.component.name`, e.g. `article_metrics.s3_downloader.count`.

use std::fmt;

/// A three-segment metric name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricName {
    namespace: String,
    component: String,
    name: String,
}

impl MetricName {
    /// Create a metric name from its three segments
    ///
    /// Segments are taken verbatim; callers are expected to pass non-empty,
    /// dot-free segments.
    pub fn new(
        namespace: impl Into<String>,
        component: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            component: component.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.namespace, self.component, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::DEFAULT_NAMESPACE;
    use proptest::prelude::*;

    #[test]
    fn test_new_metric_keeps_segments() {
        let m = MetricName::new(DEFAULT_NAMESPACE, "s3_downloader", "count");
        assert_eq!(m.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(m.component(), "s3_downloader");
        assert_eq!(m.name(), "count");
    }

    #[test]
    fn test_format_metric() {
        let m = MetricName::new(DEFAULT_NAMESPACE, "s3_downloader", "count");
        assert_eq!(
            m.to_string(),
            format!("{}.s3_downloader.count", DEFAULT_NAMESPACE)
        );
    }

    /// Property: canonical form is always the three segments joined by dots
    #[test]
    fn prop_canonical_form() {
        proptest!(|(ns in "[a-z_]{1,16}", comp in "[a-z0-9_]{1,16}", name in "[a-z0-9_]{1,16}")| {
            let m = MetricName::new(ns.clone(), comp.clone(), name.clone());
            prop_assert_eq!(m.to_string(), format!("{}.{}.{}", ns, comp, name));
        });
    }
}
