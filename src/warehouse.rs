use serde::Deserialize;

use crate::combine::{highlight_months, pick_best_roas_channel, rank_flattened};
use crate::models::{
    safe_div, ChannelSummary, DerivedRatios, ManualOverrides, MetricTotals, MonthlyMetrics,
    Platform, RankedCampaign,
};
use crate::slides::{DeviceStat, HourlyStat, SearchTermStat, SlideInput};

/// Already-aggregated per-platform rows as the external warehouse query
/// layer returns them. The automatic-import path feeds this straight into
/// the slide derivation engine, skipping the file pipeline entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarehouseSummary {
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub channels: Vec<WarehouseChannelRow>,
    #[serde(default)]
    pub top_campaigns: Vec<WarehouseCampaignRow>,
    #[serde(default)]
    pub monthly: Vec<WarehouseMonthRow>,
    #[serde(default)]
    pub search_terms: Vec<SearchTermStat>,
    #[serde(default)]
    pub hourly: Vec<HourlyStat>,
    #[serde(default)]
    pub devices: Vec<DeviceStat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseChannelRow {
    pub platform: Platform,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub conversions: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub clicks: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseCampaignRow {
    pub name: String,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub conversions: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseMonthRow {
    /// `YYYY-MM`
    pub month: String,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub conversions: f64,
    #[serde(default)]
    pub impressions: f64,
}

impl WarehouseSummary {
    /// Reduce the warehouse rows to the same shape the local pipeline
    /// feeds the derivation engine, with identical ranking rules.
    pub fn into_slide_input(self, overrides: ManualOverrides) -> SlideInput {
        let mut totals = MetricTotals::default();
        let mut summaries: Vec<ChannelSummary> = self
            .channels
            .iter()
            .map(|row| {
                let channel_totals = MetricTotals {
                    spend: row.spend,
                    revenue: row.revenue,
                    results: row.conversions,
                    impressions: row.impressions,
                    clicks: row.clicks,
                };
                totals.add(&channel_totals);
                ChannelSummary {
                    platform: row.platform,
                    display_name: row.platform.display_name().to_string(),
                    ratios: DerivedRatios::from_totals(&channel_totals),
                    totals: channel_totals,
                }
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.totals
                .spend
                .partial_cmp(&a.totals.spend)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let display = |platform: Option<Platform>| platform.map(|p| p.display_name().to_string());
        let top_channel = display(summaries.first().map(|c| c.platform));
        let second_channel = display(summaries.get(1).map(|c| c.platform));
        let best_roas_channel = display(pick_best_roas_channel(&summaries, totals.spend));

        let flattened: Vec<RankedCampaign> = self
            .top_campaigns
            .into_iter()
            .map(|row| RankedCampaign {
                roas: safe_div(row.revenue, row.spend),
                cost_per_result: safe_div(row.spend, row.conversions),
                name: row.name,
                platform: row.platform.unwrap_or(Platform::Other),
                spend: row.spend,
                revenue: row.revenue,
                results: row.conversions,
                is_top_performer: false,
                is_most_efficient: false,
            })
            .collect();
        let (top_campaigns, efficient_campaigns, most_efficient_campaign) =
            rank_flattened(flattened, totals.spend);

        let mut monthly: Vec<MonthlyMetrics> = self
            .monthly
            .into_iter()
            .map(|row| MonthlyMetrics {
                roas: safe_div(row.revenue, row.spend),
                cost_per_result: safe_div(row.spend, row.conversions),
                month: row.month,
                spend: row.spend,
                revenue: row.revenue,
                results: row.conversions,
                impressions: row.impressions,
                is_best_roas: false,
                is_worst_roas: false,
                is_best_cost_per_result: false,
                is_worst_cost_per_result: false,
            })
            .collect();
        monthly.sort_by(|a, b| a.month.cmp(&b.month));
        highlight_months(&mut monthly);

        SlideInput {
            currency: self.currency,
            ratios: DerivedRatios::from_totals(&totals),
            totals,
            results_by_type: Vec::new(),
            channels: summaries,
            top_channel,
            second_channel,
            best_roas_channel,
            top_campaigns,
            efficient_campaigns,
            most_efficient_campaign,
            monthly,
            search_terms: self.search_terms,
            hourly: self.hourly,
            devices: self.devices,
            overrides,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slides::{derive_slides, SlideKind};

    fn summary_json() -> &'static str {
        r#"{
            "currency": "EUR",
            "channels": [
                {"platform": "google", "spend": 700, "revenue": 2100, "conversions": 70, "impressions": 500000, "clicks": 9000},
                {"platform": "meta", "spend": 300, "revenue": 600, "conversions": 40, "impressions": 700000, "clicks": 8000}
            ],
            "top_campaigns": [
                {"name": "Brand", "platform": "google", "spend": 400, "revenue": 1600, "conversions": 40},
                {"name": "Prospecting", "platform": "meta", "spend": 200, "revenue": 300, "conversions": 25}
            ],
            "monthly": [
                {"month": "2024-02", "spend": 500, "revenue": 900, "conversions": 50, "impressions": 600000},
                {"month": "2024-01", "spend": 500, "revenue": 1800, "conversions": 60, "impressions": 600000}
            ],
            "search_terms": [
                {"term": "trail shoes", "clicks": 900, "conversions": 40}
            ],
            "hourly": [
                {"hour": 21, "clicks": 300, "conversions": 12}
            ],
            "devices": [
                {"device": "mobile", "clicks": 12000, "spend": 650}
            ]
        }"#
    }

    #[test]
    fn warehouse_summary_deserializes_with_defaults() {
        let summary: WarehouseSummary = serde_json::from_str("{}").unwrap();
        assert!(summary.channels.is_empty());
        assert_eq!(summary.currency, "");
    }

    #[test]
    fn warehouse_input_ranks_like_the_local_path() {
        let summary: WarehouseSummary = serde_json::from_str(summary_json()).unwrap();
        let input = summary.into_slide_input(ManualOverrides::default());

        assert_eq!(input.currency, "EUR");
        assert_eq!(input.totals.spend, 1000.0);
        assert_eq!(input.top_channel.as_deref(), Some("Google Ads"));
        assert_eq!(input.second_channel.as_deref(), Some("Meta"));
        assert_eq!(input.best_roas_channel.as_deref(), Some("Google Ads"));

        assert_eq!(input.top_campaigns[0].name, "Brand");
        assert!(input.top_campaigns[0].is_top_performer);
        let efficient = input.most_efficient_campaign.as_ref().unwrap();
        assert_eq!(efficient.name, "Brand");
        assert!(efficient.is_most_efficient);

        // Months are sorted before highlighting.
        assert_eq!(input.monthly[0].month, "2024-01");
        assert!(input.monthly[0].is_best_roas);
        assert!(input.monthly[0].is_best_cost_per_result);
    }

    #[test]
    fn warehouse_input_drives_the_full_deck() {
        let summary: WarehouseSummary = serde_json::from_str(summary_json()).unwrap();
        let input = summary.into_slide_input(ManualOverrides::default());
        let slides = derive_slides(&input);
        let kinds: Vec<SlideKind> = slides.iter().map(|s| s.kind).collect();

        assert_eq!(kinds.first(), Some(&SlideKind::Intro));
        assert_eq!(kinds.last(), Some(&SlideKind::Recap));
        assert!(kinds.contains(&SlideKind::SpendRevenue));
        assert!(kinds.contains(&SlideKind::ChannelHeadToHead));
        assert!(kinds.contains(&SlideKind::SearchSectionHeader));
        assert!(kinds.contains(&SlideKind::SearchTerms));
        assert!(kinds.contains(&SlideKind::HourOfDay));
        assert!(kinds.contains(&SlideKind::DeviceBreakdown));
    }

    #[test]
    fn empty_warehouse_summary_still_yields_intro_and_recap() {
        let input = WarehouseSummary::default().into_slide_input(ManualOverrides::default());
        let slides = derive_slides(&input);
        assert_eq!(slides.len(), 2);
    }
}
