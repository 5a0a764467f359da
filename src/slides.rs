use serde::{Deserialize, Serialize};

use crate::models::{
    safe_div, AggregatedAdsData, ChannelSummary, DerivedRatios, ManualOverrides, MetricTotals,
    MonthlyMetrics, RankedCampaign, ResultsByType,
};

/// Cumulative-impression milestones reported by the milestone scan, each at
/// most once, in chronological order.
const IMPRESSION_MILESTONES: [f64; 2] = [100_000.0, 1_000_000.0];

/// Slide kinds in canonical narrative order. The derivation engine only
/// ever skips a position, never reorders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideKind {
    Intro,
    SpendRevenue,
    SpendResults,
    ChannelComparison,
    CampaignPerformance,
    MetricsGrid,
    CreativeHighlights,
    ChannelHeadToHead,
    Milestones,
    OptimizationHighlights,
    SearchSectionHeader,
    SearchTerms,
    HourOfDay,
    DeviceBreakdown,
    Recap,
}

impl SlideKind {
    pub fn id(self) -> &'static str {
        match self {
            SlideKind::Intro => "intro",
            SlideKind::SpendRevenue => "spend-revenue",
            SlideKind::SpendResults => "spend-results",
            SlideKind::ChannelComparison => "channel-comparison",
            SlideKind::CampaignPerformance => "campaign-performance",
            SlideKind::MetricsGrid => "metrics-grid",
            SlideKind::CreativeHighlights => "creative-highlights",
            SlideKind::ChannelHeadToHead => "channel-head-to-head",
            SlideKind::Milestones => "milestones",
            SlideKind::OptimizationHighlights => "optimization-highlights",
            SlideKind::SearchSectionHeader => "search-section",
            SlideKind::SearchTerms => "search-terms",
            SlideKind::HourOfDay => "hour-of-day",
            SlideKind::DeviceBreakdown => "device-breakdown",
            SlideKind::Recap => "recap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelShare {
    pub name: String,
    pub spend: f64,
    pub share_pct: f64,
    pub roas: f64,
    pub results: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub month: String,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTermStat {
    pub term: String,
    pub clicks: f64,
    pub conversions: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyStat {
    pub hour: u32,
    pub clicks: f64,
    pub conversions: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStat {
    pub device: String,
    pub clicks: f64,
    pub spend: f64,
}

/// Typed payload union; the variant always agrees with the slide kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlidePayload {
    Intro {
        currency: String,
        spend: f64,
    },
    SpendRevenue {
        currency: String,
        spend: f64,
        revenue: f64,
        roas: f64,
    },
    SpendResults {
        currency: String,
        spend: f64,
        results: f64,
        cost_per_result: f64,
    },
    ChannelComparison {
        channels: Vec<ChannelShare>,
        best_roas_channel: Option<String>,
    },
    CampaignPerformance {
        top_campaigns: Vec<RankedCampaign>,
        most_efficient: Option<RankedCampaign>,
    },
    MetricsGrid {
        impressions: f64,
        clicks: f64,
        ctr: f64,
        cpc: f64,
        cpm: f64,
        results_by_type: Vec<ResultsByType>,
    },
    CreativeHighlights {
        highlights: Vec<String>,
    },
    ChannelHeadToHead {
        first: ChannelShare,
        second: ChannelShare,
    },
    Milestones {
        milestones: Vec<Milestone>,
    },
    OptimizationHighlights {
        highlights: Vec<String>,
    },
    SectionHeader {
        section: String,
    },
    SearchTerms {
        terms: Vec<SearchTermStat>,
    },
    HourOfDay {
        hours: Vec<HourlyStat>,
    },
    DeviceBreakdown {
        devices: Vec<DeviceStat>,
    },
    Recap {
        currency: String,
        spend: f64,
        revenue: f64,
        results: f64,
        impressions: f64,
        top_channel: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: String,
    pub kind: SlideKind,
    pub title: String,
    pub subtitle: String,
    pub payload: SlidePayload,
}

impl Slide {
    fn new(kind: SlideKind, title: &str, subtitle: &str, payload: SlidePayload) -> Slide {
        Slide {
            id: kind.id().to_string(),
            kind,
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            payload,
        }
    }
}

/// What the derivation engine consumes. Built either from a locally
/// computed `AggregatedAdsData` or from a warehouse-shaped summary; the
/// engine does not care which.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideInput {
    pub currency: String,
    pub totals: MetricTotals,
    pub ratios: DerivedRatios,
    pub results_by_type: Vec<ResultsByType>,
    pub channels: Vec<ChannelSummary>,
    pub top_channel: Option<String>,
    pub second_channel: Option<String>,
    pub best_roas_channel: Option<String>,
    pub top_campaigns: Vec<RankedCampaign>,
    pub efficient_campaigns: Vec<RankedCampaign>,
    pub most_efficient_campaign: Option<RankedCampaign>,
    pub monthly: Vec<MonthlyMetrics>,
    pub search_terms: Vec<SearchTermStat>,
    pub hourly: Vec<HourlyStat>,
    pub devices: Vec<DeviceStat>,
    pub overrides: ManualOverrides,
}

impl SlideInput {
    pub fn from_aggregate(aggregate: &AggregatedAdsData, overrides: ManualOverrides) -> SlideInput {
        let display = |platform: Option<crate::models::Platform>| {
            platform.map(|p| p.display_name().to_string())
        };
        SlideInput {
            currency: aggregate.currency.clone(),
            totals: aggregate.totals,
            ratios: aggregate.ratios,
            results_by_type: aggregate.results_by_type.clone(),
            channels: aggregate.channels.clone(),
            top_channel: display(aggregate.top_channel),
            second_channel: display(aggregate.second_channel),
            best_roas_channel: display(aggregate.best_roas_channel),
            top_campaigns: aggregate.top_campaigns_by_revenue.clone(),
            efficient_campaigns: aggregate.top_campaigns_by_roas.clone(),
            most_efficient_campaign: aggregate.most_efficient_campaign.clone(),
            monthly: aggregate.monthly.clone(),
            search_terms: Vec::new(),
            hourly: Vec::new(),
            devices: Vec::new(),
            overrides,
        }
    }

    /// Computed revenue wins over a manually entered figure; the override
    /// only fills the gap when the aggregate carries nothing.
    fn effective_revenue(&self) -> f64 {
        if self.totals.revenue > 0.0 {
            self.totals.revenue
        } else {
            self.overrides.revenue.unwrap_or(0.0)
        }
    }

    fn share(&self, channel: &ChannelSummary) -> ChannelShare {
        ChannelShare {
            name: channel.display_name.clone(),
            spend: channel.totals.spend,
            share_pct: safe_div(channel.totals.spend, self.totals.spend) * 100.0,
            roas: channel.ratios.roas,
            results: channel.totals.results,
        }
    }
}

type SlideBuilder = fn(&SlideInput) -> Option<Slide>;

/// The canonical sequence: every slide kind has one fixed position and a
/// presence predicate. Positions are only ever skipped, never reordered.
const MAIN_SEQUENCE: &[SlideBuilder] = &[
    build_intro,
    build_spend_revenue,
    build_spend_results,
    build_channel_comparison,
    build_campaign_performance,
    build_metrics_grid,
    build_creative_highlights,
    build_head_to_head,
    build_milestones,
    build_optimization_highlights,
];

/// Search deep-dive slides, gated behind their section header.
const SEARCH_SEQUENCE: &[SlideBuilder] = &[build_search_terms, build_hour_of_day, build_device_breakdown];

pub fn derive_slides(input: &SlideInput) -> Vec<Slide> {
    let mut slides: Vec<Slide> = MAIN_SEQUENCE
        .iter()
        .filter_map(|builder| builder(input))
        .collect();

    // The section header only appears when at least one detail slide does.
    let detail: Vec<Slide> = SEARCH_SEQUENCE
        .iter()
        .filter_map(|builder| builder(input))
        .collect();
    if !detail.is_empty() {
        slides.push(Slide::new(
            SlideKind::SearchSectionHeader,
            "Search deep dive",
            "What happened inside your search campaigns",
            SlidePayload::SectionHeader {
                section: "search".to_string(),
            },
        ));
        slides.extend(detail);
    }

    slides.push(build_recap(input));
    slides
}

fn build_intro(input: &SlideInput) -> Option<Slide> {
    Some(Slide::new(
        SlideKind::Intro,
        "Your Ads Wrapped",
        "A year of campaigns, in numbers",
        SlidePayload::Intro {
            currency: input.currency.clone(),
            spend: input.totals.spend,
        },
    ))
}

fn build_spend_revenue(input: &SlideInput) -> Option<Slide> {
    let revenue = input.effective_revenue();
    if revenue <= 0.0 {
        return None;
    }
    Some(Slide::new(
        SlideKind::SpendRevenue,
        "What you put in, what came back",
        "Ad spend against attributed revenue",
        SlidePayload::SpendRevenue {
            currency: input.currency.clone(),
            spend: input.totals.spend,
            revenue,
            roas: safe_div(revenue, input.totals.spend),
        },
    ))
}

fn build_spend_results(input: &SlideInput) -> Option<Slide> {
    if input.effective_revenue() > 0.0 || input.totals.results <= 0.0 {
        return None;
    }
    Some(Slide::new(
        SlideKind::SpendResults,
        "What you put in, what came back",
        "Ad spend against results",
        SlidePayload::SpendResults {
            currency: input.currency.clone(),
            spend: input.totals.spend,
            results: input.totals.results,
            cost_per_result: safe_div(input.totals.spend, input.totals.results),
        },
    ))
}

fn build_channel_comparison(input: &SlideInput) -> Option<Slide> {
    let top = input.top_channel.as_deref().filter(|n| !n.is_empty())?;
    let channels = input.channels.iter().map(|c| input.share(c)).collect();
    Some(Slide::new(
        SlideKind::ChannelComparison,
        "Where the budget went",
        &format!("{top} led the pack"),
        SlidePayload::ChannelComparison {
            channels,
            best_roas_channel: input.best_roas_channel.clone(),
        },
    ))
}

fn build_campaign_performance(input: &SlideInput) -> Option<Slide> {
    if input.top_campaigns.is_empty() {
        return None;
    }
    Some(Slide::new(
        SlideKind::CampaignPerformance,
        "Your campaigns, ranked",
        "Top performers by revenue",
        SlidePayload::CampaignPerformance {
            top_campaigns: input.top_campaigns.clone(),
            most_efficient: input.most_efficient_campaign.clone(),
        },
    ))
}

fn build_metrics_grid(input: &SlideInput) -> Option<Slide> {
    if input.totals.impressions <= 0.0 && input.totals.clicks <= 0.0 {
        return None;
    }
    Some(Slide::new(
        SlideKind::MetricsGrid,
        "The numbers",
        "Reach, clicks and what they cost",
        SlidePayload::MetricsGrid {
            impressions: input.totals.impressions,
            clicks: input.totals.clicks,
            ctr: safe_div(input.totals.clicks, input.totals.impressions) * 100.0,
            cpc: safe_div(input.totals.spend, input.totals.clicks),
            cpm: safe_div(input.totals.spend, input.totals.impressions) * 1000.0,
            results_by_type: input.results_by_type.clone(),
        },
    ))
}

fn build_creative_highlights(input: &SlideInput) -> Option<Slide> {
    if input.overrides.creative_highlights.is_empty() {
        return None;
    }
    Some(Slide::new(
        SlideKind::CreativeHighlights,
        "Creative that carried the year",
        "Your standout ads",
        SlidePayload::CreativeHighlights {
            highlights: input.overrides.creative_highlights.clone(),
        },
    ))
}

fn build_head_to_head(input: &SlideInput) -> Option<Slide> {
    let first_name = input.top_channel.as_deref().filter(|n| !n.is_empty())?;
    let second_name = input.second_channel.as_deref().filter(|n| !n.is_empty())?;
    let first = input.channels.iter().find(|c| c.display_name == first_name)?;
    let second = input.channels.iter().find(|c| c.display_name == second_name)?;
    Some(Slide::new(
        SlideKind::ChannelHeadToHead,
        &format!("{first_name} vs {second_name}"),
        "Your two biggest channels, side by side",
        SlidePayload::ChannelHeadToHead {
            first: input.share(first),
            second: input.share(second),
        },
    ))
}

/// Scan the monthly rollup for moments worth calling out. Cumulative
/// impressions are carried in a single chronological pass; each crossing is
/// reported at most once. Absent data yields fewer milestones, never a
/// placeholder.
pub fn detect_milestones(monthly: &[MonthlyMetrics]) -> Vec<Milestone> {
    let mut milestones = Vec::new();

    let most_results = monthly.iter().fold(None::<&MonthlyMetrics>, |best, month| {
        match best {
            Some(current) if current.results >= month.results => best,
            _ => Some(month),
        }
    });
    if let Some(month) = most_results.filter(|m| m.results > 0.0) {
        milestones.push(Milestone {
            month: month.month.clone(),
            label: "Most results in a single month".to_string(),
            value: month.results,
        });
    }

    let mut cumulative = 0.0;
    let mut next_threshold = IMPRESSION_MILESTONES.iter();
    let mut pending = next_threshold.next();
    for month in monthly {
        cumulative += month.impressions;
        while let Some(&threshold) = pending {
            if cumulative < threshold {
                break;
            }
            milestones.push(Milestone {
                month: month.month.clone(),
                label: format!("Crossed {} impressions", format_count(threshold)),
                value: threshold,
            });
            pending = next_threshold.next();
        }
    }

    if let Some(month) = monthly
        .iter()
        .find(|m| m.is_best_cost_per_result && m.cost_per_result > 0.0)
    {
        milestones.push(Milestone {
            month: month.month.clone(),
            label: "Cheapest results of the year".to_string(),
            value: month.cost_per_result,
        });
    }

    if let Some(month) = monthly.iter().find(|m| m.is_best_roas && m.roas > 0.0) {
        milestones.push(Milestone {
            month: month.month.clone(),
            label: "Best return on ad spend".to_string(),
            value: month.roas,
        });
    }

    milestones
}

fn format_count(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{}M", value / 1_000_000.0)
    } else {
        format!("{}K", value / 1_000.0)
    }
}

fn build_milestones(input: &SlideInput) -> Option<Slide> {
    let milestones = detect_milestones(&input.monthly);
    if milestones.is_empty() {
        return None;
    }
    Some(Slide::new(
        SlideKind::Milestones,
        "Moments that mattered",
        "Milestones from your year",
        SlidePayload::Milestones { milestones },
    ))
}

fn build_optimization_highlights(input: &SlideInput) -> Option<Slide> {
    if input.overrides.optimization_highlights.is_empty() {
        return None;
    }
    Some(Slide::new(
        SlideKind::OptimizationHighlights,
        "Tuned along the way",
        "Optimizations that paid off",
        SlidePayload::OptimizationHighlights {
            highlights: input.overrides.optimization_highlights.clone(),
        },
    ))
}

fn build_search_terms(input: &SlideInput) -> Option<Slide> {
    if input.search_terms.is_empty() {
        return None;
    }
    Some(Slide::new(
        SlideKind::SearchTerms,
        "What people searched",
        "Top search terms that found you",
        SlidePayload::SearchTerms {
            terms: input.search_terms.clone(),
        },
    ))
}

fn build_hour_of_day(input: &SlideInput) -> Option<Slide> {
    if input.hourly.is_empty() {
        return None;
    }
    Some(Slide::new(
        SlideKind::HourOfDay,
        "Around the clock",
        "When your ads worked hardest",
        SlidePayload::HourOfDay {
            hours: input.hourly.clone(),
        },
    ))
}

fn build_device_breakdown(input: &SlideInput) -> Option<Slide> {
    if input.devices.is_empty() {
        return None;
    }
    Some(Slide::new(
        SlideKind::DeviceBreakdown,
        "Screens of every size",
        "Where your audience was",
        SlidePayload::DeviceBreakdown {
            devices: input.devices.clone(),
        },
    ))
}

fn build_recap(input: &SlideInput) -> Slide {
    Slide::new(
        SlideKind::Recap,
        "That was your year",
        "The whole story in one place",
        SlidePayload::Recap {
            currency: input.currency.clone(),
            spend: input.totals.spend,
            revenue: input.effective_revenue(),
            results: input.totals.results,
            impressions: input.totals.impressions,
            top_channel: input.top_channel.clone(),
        },
    )
}
