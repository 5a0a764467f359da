use std::collections::BTreeMap;

use chrono::Datelike;

use crate::models::{
    safe_div, AggregatedAdsData, ChannelData, ChannelSummary, DerivedRatios, MetricTotals,
    MonthlyMetrics, Platform, RankedCampaign, ResultsByType,
};

/// A channel qualifies for the best-ROAS pick only if it carries at least
/// this share of total spend.
const CHANNEL_EFFICIENCY_FLOOR: f64 = 0.01;

/// A campaign qualifies for the efficiency ranking only above this share of
/// total spend.
const CAMPAIGN_EFFICIENCY_FLOOR: f64 = 0.005;

const TOP_CAMPAIGN_LIMIT: usize = 10;

/// Reduce the working set of channels to the cross-channel projection.
/// Pure: the same channel list always produces identical output, so a
/// channel can be replaced and the projection recomputed at any time.
pub fn combine_channels(channels: &[ChannelData]) -> AggregatedAdsData {
    let mut totals = MetricTotals::default();
    let mut by_type: Vec<ResultsByType> = Vec::new();
    for channel in channels {
        totals.add(&channel.totals);
        for entry in &channel.results_by_type {
            match by_type.iter_mut().find(|e| e.result_type == entry.result_type) {
                Some(existing) => {
                    existing.count += entry.count;
                    existing.value += entry.value;
                    existing.spend += entry.spend;
                }
                None => by_type.push(entry.clone()),
            }
        }
    }

    // Blended ratios come from summed totals, never from averaging the
    // per-channel ratios, which would mis-weight unequal spenders.
    let ratios = DerivedRatios::from_totals(&totals);

    let currency = channels
        .iter()
        .map(|c| c.currency.trim())
        .find(|c| !c.is_empty())
        .unwrap_or("")
        .to_string();

    let mut summaries: Vec<ChannelSummary> = channels
        .iter()
        .map(|c| ChannelSummary {
            platform: c.platform,
            display_name: c.platform.display_name().to_string(),
            totals: c.totals,
            ratios: c.ratios,
        })
        .collect();
    // Stable sort: exact spend ties keep first-seen order.
    summaries.sort_by(|a, b| {
        b.totals
            .spend
            .partial_cmp(&a.totals.spend)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let top_channel = summaries.first().map(|c| c.platform);
    let second_channel = summaries.get(1).map(|c| c.platform);
    let best_roas_channel = pick_best_roas_channel(&summaries, totals.spend);

    let (top_by_revenue, top_by_roas, most_efficient) = rank_campaigns(channels, totals.spend);
    let monthly = monthly_rollup(channels);

    AggregatedAdsData {
        currency,
        totals,
        ratios,
        results_by_type: by_type,
        channels: summaries,
        top_channel,
        second_channel,
        best_roas_channel,
        top_campaigns_by_revenue: top_by_revenue,
        top_campaigns_by_roas: top_by_roas,
        most_efficient_campaign: most_efficient,
        monthly,
    }
}

/// Highest-ROAS channel among those spending at least 1% of the total.
/// Absent when nothing qualifies; never defaulted to an arbitrary channel.
pub(crate) fn pick_best_roas_channel(
    summaries: &[ChannelSummary],
    total_spend: f64,
) -> Option<Platform> {
    let floor = total_spend * CHANNEL_EFFICIENCY_FLOOR;
    summaries
        .iter()
        .filter(|c| c.totals.spend > 0.0 && c.totals.spend >= floor)
        .fold(None::<&ChannelSummary>, |best, candidate| match best {
            Some(current) if current.ratios.roas >= candidate.ratios.roas => best,
            _ => Some(candidate),
        })
        .map(|c| c.platform)
}

fn rank_campaigns(
    channels: &[ChannelData],
    total_spend: f64,
) -> (Vec<RankedCampaign>, Vec<RankedCampaign>, Option<RankedCampaign>) {
    let flattened: Vec<RankedCampaign> = channels
        .iter()
        .flat_map(|channel| {
            channel.campaigns.iter().map(|campaign| RankedCampaign {
                name: campaign.name.clone(),
                platform: channel.platform,
                spend: campaign.totals.spend,
                revenue: campaign.totals.revenue,
                results: campaign.totals.results,
                roas: campaign.ratios.roas,
                cost_per_result: campaign.ratios.cost_per_result,
                is_top_performer: false,
                is_most_efficient: false,
            })
        })
        .collect();

    rank_flattened(flattened, total_spend)
}

/// Rank an already-flattened campaign list: top 10 by revenue, top 10 by
/// ROAS above the spend floor, and the single most efficient campaign.
/// Shared by the local and warehouse-shaped paths.
pub(crate) fn rank_flattened(
    mut flattened: Vec<RankedCampaign>,
    total_spend: f64,
) -> (Vec<RankedCampaign>, Vec<RankedCampaign>, Option<RankedCampaign>) {
    let mut by_revenue = flattened.clone();
    by_revenue.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    by_revenue.truncate(TOP_CAMPAIGN_LIMIT);

    let floor = total_spend * CAMPAIGN_EFFICIENCY_FLOOR;
    flattened.retain(|c| c.spend > 0.0 && c.spend >= floor);
    flattened.sort_by(|a, b| b.roas.partial_cmp(&a.roas).unwrap_or(std::cmp::Ordering::Equal));
    flattened.truncate(TOP_CAMPAIGN_LIMIT);
    let mut by_roas = flattened;

    // The two badges are independent; the same campaign may carry both.
    let top_identity = by_revenue.first().map(|c| (c.name.clone(), c.platform));
    let efficient_identity = by_roas.first().map(|c| (c.name.clone(), c.platform));
    for campaign in by_revenue.iter_mut().chain(by_roas.iter_mut()) {
        let identity = (campaign.name.clone(), campaign.platform);
        if Some(&identity) == top_identity.as_ref() {
            campaign.is_top_performer = true;
        }
        if Some(&identity) == efficient_identity.as_ref() {
            campaign.is_most_efficient = true;
        }
    }
    let most_efficient = by_roas.first().cloned();

    (by_revenue, by_roas, most_efficient)
}

/// Merge all channels' daily records by exact date, then group by calendar
/// month. Best/worst highlighting only considers months with both spend and
/// results, so a month cannot win on a zero-divided ratio.
fn monthly_rollup(channels: &[ChannelData]) -> Vec<MonthlyMetrics> {
    let mut by_date: BTreeMap<chrono::NaiveDate, MetricTotals> = BTreeMap::new();
    for channel in channels {
        for day in &channel.daily {
            let entry = by_date.entry(day.date).or_default();
            entry.spend += day.spend;
            entry.revenue += day.revenue;
            entry.results += day.results;
            entry.impressions += day.impressions;
            entry.clicks += day.clicks;
        }
    }

    let mut by_month: BTreeMap<String, MetricTotals> = BTreeMap::new();
    for (date, totals) in by_date {
        let month = format!("{:04}-{:02}", date.year(), date.month());
        by_month.entry(month).or_default().add(&totals);
    }

    let mut months: Vec<MonthlyMetrics> = by_month
        .into_iter()
        .map(|(month, t)| MonthlyMetrics {
            month,
            spend: t.spend,
            revenue: t.revenue,
            results: t.results,
            impressions: t.impressions,
            roas: safe_div(t.revenue, t.spend),
            cost_per_result: safe_div(t.spend, t.results),
            is_best_roas: false,
            is_worst_roas: false,
            is_best_cost_per_result: false,
            is_worst_cost_per_result: false,
        })
        .collect();

    highlight_months(&mut months);
    months
}

/// Flag the best/worst months by ROAS and by cost-per-result. Only months
/// with both spend and results qualify; ties keep the earliest month.
pub(crate) fn highlight_months(months: &mut [MonthlyMetrics]) {
    let qualified: Vec<usize> = months
        .iter()
        .enumerate()
        .filter(|(_, m)| m.spend > 0.0 && m.results > 0.0)
        .map(|(i, _)| i)
        .collect();

    let pick = |months: &[MonthlyMetrics],
                indices: &[usize],
                better: &dyn Fn(&MonthlyMetrics, &MonthlyMetrics) -> bool| {
        indices.iter().copied().fold(None::<usize>, |best, i| match best {
            Some(b) if !better(&months[i], &months[b]) => Some(b),
            _ => Some(i),
        })
    };

    let best_roas = pick(&months, &qualified, &|a, b| a.roas > b.roas);
    let worst_roas = pick(&months, &qualified, &|a, b| a.roas < b.roas);
    let best_cpr = pick(&months, &qualified, &|a, b| {
        a.cost_per_result < b.cost_per_result
    });
    let worst_cpr = pick(&months, &qualified, &|a, b| {
        a.cost_per_result > b.cost_per_result
    });

    if let Some(i) = best_roas {
        months[i].is_best_roas = true;
    }
    if let Some(i) = worst_roas {
        months[i].is_worst_roas = true;
    }
    if let Some(i) = best_cpr {
        months[i].is_best_cost_per_result = true;
    }
    if let Some(i) = worst_cpr {
        months[i].is_worst_cost_per_result = true;
    }
}
