use std::fmt::Write;

use crate::models::AggregatedAdsData;

/// Render the cross-channel aggregate as a markdown summary, for checking
/// an import outside the presentation flow.
pub fn build_report(aggregate: &AggregatedAdsData) -> String {
    let mut output = String::new();
    let currency = if aggregate.currency.is_empty() {
        String::new()
    } else {
        format!(" {}", aggregate.currency)
    };

    let _ = writeln!(output, "# Ads Wrapped Summary");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    let _ = writeln!(output, "- Spend: {:.2}{}", aggregate.totals.spend, currency);
    let _ = writeln!(output, "- Revenue: {:.2}{}", aggregate.totals.revenue, currency);
    let _ = writeln!(output, "- Results: {:.0}", aggregate.totals.results);
    let _ = writeln!(output, "- Impressions: {:.0}", aggregate.totals.impressions);
    let _ = writeln!(output, "- Clicks: {:.0}", aggregate.totals.clicks);
    let _ = writeln!(
        output,
        "- ROAS {:.2} | CPR {:.2} | CPM {:.2} | CPC {:.2} | CTR {:.2}%",
        aggregate.ratios.roas,
        aggregate.ratios.cost_per_result,
        aggregate.ratios.cpm,
        aggregate.ratios.cpc,
        aggregate.ratios.ctr
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Channels");
    if aggregate.channels.is_empty() {
        let _ = writeln!(output, "No channels imported.");
    } else {
        for channel in &aggregate.channels {
            let _ = writeln!(
                output,
                "- {}: spend {:.2}, revenue {:.2}, ROAS {:.2}",
                channel.display_name, channel.totals.spend, channel.totals.revenue, channel.ratios.roas
            );
        }
        if let Some(platform) = aggregate.best_roas_channel {
            let _ = writeln!(output, "- Best ROAS: {}", platform.display_name());
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Campaigns");
    if aggregate.top_campaigns_by_revenue.is_empty() {
        let _ = writeln!(output, "No campaigns found.");
    } else {
        for campaign in aggregate.top_campaigns_by_revenue.iter().take(10) {
            let mut badges = String::new();
            if campaign.is_top_performer {
                badges.push_str(" [top performer]");
            }
            if campaign.is_most_efficient {
                badges.push_str(" [most efficient]");
            }
            let _ = writeln!(
                output,
                "- {} ({}): revenue {:.2}, spend {:.2}, ROAS {:.2}{}",
                campaign.name,
                campaign.platform.display_name(),
                campaign.revenue,
                campaign.spend,
                campaign.roas,
                badges
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Months");
    if aggregate.monthly.is_empty() {
        let _ = writeln!(output, "No dated rows imported.");
    } else {
        for month in &aggregate.monthly {
            let mut flags = String::new();
            if month.is_best_roas {
                flags.push_str(" [best ROAS]");
            }
            if month.is_worst_roas {
                flags.push_str(" [worst ROAS]");
            }
            if month.is_best_cost_per_result {
                flags.push_str(" [best CPR]");
            }
            if month.is_worst_cost_per_result {
                flags.push_str(" [worst CPR]");
            }
            let _ = writeln!(
                output,
                "- {}: spend {:.2}, revenue {:.2}, results {:.0}{}",
                month.month, month.spend, month.revenue, month.results, flags
            );
        }
    }

    output
}
