use serde::Serialize;

use crate::error::ImportError;
use crate::models::Platform;

/// Canonical metrics a platform export may carry. Each platform owns an
/// ordered synonym list per metric; list order is preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    Campaign,
    Date,
    Spend,
    Revenue,
    Impressions,
    Clicks,
    Results,
    Conversions,
    ResultType,
}

pub const ALL_METRICS: [MetricKey; 9] = [
    MetricKey::Campaign,
    MetricKey::Date,
    MetricKey::Spend,
    MetricKey::Revenue,
    MetricKey::Impressions,
    MetricKey::Clicks,
    MetricKey::Results,
    MetricKey::Conversions,
    MetricKey::ResultType,
];

/// Ordered candidate headers for `(platform, metric)`, covering the column
/// names the platforms' export UIs have used across versions and locales.
pub fn candidates(platform: Platform, metric: MetricKey) -> &'static [&'static str] {
    match (platform, metric) {
        (Platform::Meta, MetricKey::Campaign) => &["campaign name", "campaign"],
        (Platform::Meta, MetricKey::Date) => &["day", "date", "reporting starts"],
        (Platform::Meta, MetricKey::Spend) => {
            &["amount spent (usd)", "amount spent", "spend", "cost"]
        }
        (Platform::Meta, MetricKey::Revenue) => &[
            "purchases conversion value",
            "purchase conversion value",
            "website purchases conversion value",
            "conversion value",
            "revenue",
        ],
        (Platform::Meta, MetricKey::Impressions) => &["impressions"],
        (Platform::Meta, MetricKey::Clicks) => &["link clicks", "clicks (all)", "clicks"],
        (Platform::Meta, MetricKey::Results) => &["results"],
        (Platform::Meta, MetricKey::Conversions) => &["website purchases", "purchases", "conversions"],
        (Platform::Meta, MetricKey::ResultType) => &["result indicator", "result type"],

        (Platform::Google, MetricKey::Campaign) => &["campaign", "campaign name"],
        (Platform::Google, MetricKey::Date) => &["day", "date"],
        (Platform::Google, MetricKey::Spend) => &["cost", "cost (usd)", "spend", "amount spent"],
        (Platform::Google, MetricKey::Revenue) => &[
            "conv. value",
            "total conv. value",
            "conversion value",
            "revenue",
        ],
        (Platform::Google, MetricKey::Impressions) => &["impr.", "impressions"],
        (Platform::Google, MetricKey::Clicks) => &["clicks"],
        (Platform::Google, MetricKey::Results) => &["results"],
        (Platform::Google, MetricKey::Conversions) => &["conversions", "conv.", "all conv."],
        (Platform::Google, MetricKey::ResultType) => &["conversion action", "result type"],

        (Platform::Tiktok, MetricKey::Campaign) => &["campaign name", "campaign"],
        (Platform::Tiktok, MetricKey::Date) => &["date", "day", "stat time day"],
        (Platform::Tiktok, MetricKey::Spend) => &["total cost", "cost", "spend", "amount spent"],
        (Platform::Tiktok, MetricKey::Revenue) => &[
            "total purchase value",
            "purchase value",
            "total complete payment value",
            "revenue",
        ],
        (Platform::Tiktok, MetricKey::Impressions) => &["impressions", "impression"],
        (Platform::Tiktok, MetricKey::Clicks) => &["clicks (destination)", "clicks"],
        (Platform::Tiktok, MetricKey::Results) => &["results", "result"],
        (Platform::Tiktok, MetricKey::Conversions) => &["conversions", "total purchases", "purchases"],
        (Platform::Tiktok, MetricKey::ResultType) => &["result type", "optimization goal"],

        (Platform::Linkedin, MetricKey::Campaign) => &["campaign name", "campaign"],
        (Platform::Linkedin, MetricKey::Date) => &["date", "day", "start date"],
        (Platform::Linkedin, MetricKey::Spend) => &["total spent", "amount spent", "spend", "cost"],
        (Platform::Linkedin, MetricKey::Revenue) => &["conversion value", "revenue"],
        (Platform::Linkedin, MetricKey::Impressions) => &["impressions"],
        (Platform::Linkedin, MetricKey::Clicks) => &["clicks"],
        (Platform::Linkedin, MetricKey::Results) => &["results", "leads"],
        (Platform::Linkedin, MetricKey::Conversions) => &["conversions", "external website conversions"],
        (Platform::Linkedin, MetricKey::ResultType) => &["result type"],

        (Platform::Other, MetricKey::Campaign) => &["campaign name", "campaign", "ad group", "name"],
        (Platform::Other, MetricKey::Date) => &["date", "day"],
        (Platform::Other, MetricKey::Spend) => &["spend", "cost", "amount spent", "total cost"],
        (Platform::Other, MetricKey::Revenue) => &["revenue", "conversion value", "value"],
        (Platform::Other, MetricKey::Impressions) => &["impressions", "impr"],
        (Platform::Other, MetricKey::Clicks) => &["clicks"],
        (Platform::Other, MetricKey::Results) => &["results"],
        (Platform::Other, MetricKey::Conversions) => &["conversions", "conv"],
        (Platform::Other, MetricKey::ResultType) => &["result type"],
    }
}

/// How a canonical metric was bound to an actual header. The confidence tag
/// is diagnostic only; it never changes numeric output.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnBinding {
    pub metric: MetricKey,
    pub header: String,
    pub index: usize,
    pub exact: bool,
}

/// The resolver's output for one parsed header row.
#[derive(Debug, Clone, Default)]
pub struct ResolvedColumns {
    bindings: Vec<ColumnBinding>,
}

impl ResolvedColumns {
    pub fn get(&self, metric: MetricKey) -> Option<&ColumnBinding> {
        self.bindings.iter().find(|b| b.metric == metric)
    }

    pub fn header(&self, metric: MetricKey) -> Option<&str> {
        self.get(metric).map(|b| b.header.as_str())
    }

    /// Diagnostics side channel for display before committing an import.
    pub fn bindings(&self) -> &[ColumnBinding] {
        &self.bindings
    }
}

/// Best-matching header for one canonical metric. First pass is exact
/// case-insensitive equality in candidate order; second pass is substring
/// containment in either direction, again in candidate order.
pub fn resolve_metric(
    headers: &[String],
    platform: Platform,
    metric: MetricKey,
) -> Option<ColumnBinding> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    for candidate in candidates(platform, metric) {
        if let Some(index) = lowered.iter().position(|h| h == candidate) {
            return Some(ColumnBinding {
                metric,
                header: headers[index].clone(),
                index,
                exact: true,
            });
        }
    }

    for candidate in candidates(platform, metric) {
        if let Some(index) = lowered
            .iter()
            .position(|h| !h.is_empty() && (h.contains(candidate) || candidate.contains(h.as_str())))
        {
            return Some(ColumnBinding {
                metric,
                header: headers[index].clone(),
                index,
                exact: false,
            });
        }
    }

    None
}

/// Resolve every canonical metric against the parsed headers. A metric with
/// no match is simply absent (downstream treats it as zero), except that a
/// file resolving neither spend nor impressions carries no usable signal
/// and is rejected outright.
pub fn resolve_columns(
    headers: &[String],
    platform: Platform,
) -> Result<ResolvedColumns, ImportError> {
    let bindings: Vec<ColumnBinding> = ALL_METRICS
        .iter()
        .filter_map(|&metric| resolve_metric(headers, platform, metric))
        .collect();

    let resolved = ResolvedColumns { bindings };
    if resolved.get(MetricKey::Spend).is_none() && resolved.get(MetricKey::Impressions).is_none() {
        return Err(ImportError::UnrecognizedFormat {
            platform: platform.display_name(),
        });
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_follows_candidate_order_not_column_order() {
        // "Cost" appears first in the file, but the Meta candidate list
        // prefers "Amount spent (USD)".
        let headers = headers(&["Cost", "Amount spent (USD)"]);
        let binding = resolve_metric(&headers, Platform::Meta, MetricKey::Spend).unwrap();
        assert_eq!(binding.header, "Amount spent (USD)");
        assert_eq!(binding.index, 1);
        assert!(binding.exact);
    }

    #[test]
    fn substring_match_is_fallback_and_tagged_fuzzy() {
        let headers = headers(&["Campaign", "Amount spent (USD) - March"]);
        let binding = resolve_metric(&headers, Platform::Meta, MetricKey::Spend).unwrap();
        assert_eq!(binding.header, "Amount spent (USD) - March");
        assert!(!binding.exact);
    }

    #[test]
    fn substring_matches_in_both_directions() {
        // Header text contained within the candidate still matches.
        let headers = headers(&["Impress"]);
        let binding = resolve_metric(&headers, Platform::Other, MetricKey::Impressions).unwrap();
        assert_eq!(binding.header, "Impress");
        assert!(!binding.exact);
    }

    #[test]
    fn unresolved_metric_is_absent() {
        let headers = headers(&["Campaign", "Cost"]);
        assert!(resolve_metric(&headers, Platform::Meta, MetricKey::ResultType).is_none());
    }

    #[test]
    fn rejects_file_without_spend_or_impressions() {
        let headers = headers(&["Campaign", "Notes"]);
        let err = resolve_columns(&headers, Platform::Meta).unwrap_err();
        assert!(matches!(err, ImportError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn accepts_file_with_only_impressions() {
        let headers = headers(&["Campaign", "Impressions"]);
        let resolved = resolve_columns(&headers, Platform::Meta).unwrap();
        assert!(resolved.get(MetricKey::Impressions).is_some());
        assert!(resolved.get(MetricKey::Spend).is_none());
    }

    #[test]
    fn bindings_expose_diagnostics() {
        let headers = headers(&["Campaign name", "Amount spent (USD)", "Impressions"]);
        let resolved = resolve_columns(&headers, Platform::Meta).unwrap();
        let spend = resolved.get(MetricKey::Spend).unwrap();
        assert!(spend.exact);
        assert_eq!(resolved.header(MetricKey::Campaign), Some("Campaign name"));
        assert_eq!(resolved.bindings().len(), 3);
    }
}
