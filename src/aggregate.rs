use chrono::NaiveDate;

use crate::columns::{MetricKey, ResolvedColumns};
use crate::models::{
    CampaignData, ChannelData, DailyMetrics, DerivedRatios, MetricTotals, Platform, ResultType,
    ResultsByType,
};
use crate::parser::ParsedTable;

/// Strip currency symbols, thousands separators, percent signs and
/// whitespace, then parse as floating point. Unparsable cells are 0.
pub fn parse_numeric(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

const DATE_FALLBACK_FORMATS: [&str; 6] = [
    "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%b %d, %Y", "%B %d, %Y", "%d %b %Y",
];

/// Normalize a raw date cell to a calendar date: exact `YYYY-MM-DD` first,
/// then a fixed list of common export formats. Unparsable dates exclude the
/// row from the daily bucket only.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    DATE_FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Per-row values after column resolution and normalization.
struct RowMetrics {
    campaign: Option<String>,
    date: Option<NaiveDate>,
    spend: f64,
    revenue: f64,
    impressions: f64,
    clicks: f64,
    results: f64,
    result_type: ResultType,
}

fn cell<'a>(row: &'a [String], columns: &ResolvedColumns, metric: MetricKey) -> Option<&'a str> {
    columns
        .get(metric)
        .and_then(|binding| row.get(binding.index))
        .map(|s| s.as_str())
}

fn extract_row(row: &[String], columns: &ResolvedColumns) -> RowMetrics {
    let campaign = cell(row, columns, MetricKey::Campaign)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    let date = cell(row, columns, MetricKey::Date).and_then(parse_date);

    // Results preferentially come from the dedicated results column and
    // fall back to a conversions-style column.
    let results = match cell(row, columns, MetricKey::Results) {
        Some(raw) => parse_numeric(raw),
        None => cell(row, columns, MetricKey::Conversions)
            .map(parse_numeric)
            .unwrap_or(0.0),
    };
    let result_type = cell(row, columns, MetricKey::ResultType)
        .map(ResultType::from_label)
        .unwrap_or(ResultType::Other);

    RowMetrics {
        campaign,
        date,
        spend: cell(row, columns, MetricKey::Spend).map(parse_numeric).unwrap_or(0.0),
        revenue: cell(row, columns, MetricKey::Revenue).map(parse_numeric).unwrap_or(0.0),
        impressions: cell(row, columns, MetricKey::Impressions)
            .map(parse_numeric)
            .unwrap_or(0.0),
        clicks: cell(row, columns, MetricKey::Clicks).map(parse_numeric).unwrap_or(0.0),
        results,
        result_type,
    }
}

#[derive(Default)]
struct TypeAccumulator {
    entries: Vec<(ResultType, f64, f64, f64)>,
}

impl TypeAccumulator {
    /// Encounter order is preserved; the entry list doubles as the output
    /// order, which keeps aggregation deterministic.
    fn add(&mut self, result_type: ResultType, count: f64, value: f64, spend: f64) {
        match self.entries.iter_mut().find(|(t, ..)| *t == result_type) {
            Some(entry) => {
                entry.1 += count;
                entry.2 += value;
                entry.3 += spend;
            }
            None => self.entries.push((result_type, count, value, spend)),
        }
    }

    fn into_results(self) -> Vec<ResultsByType> {
        self.entries
            .into_iter()
            .map(|(result_type, count, value, spend)| ResultsByType {
                result_type,
                display_name: result_type.display_name().to_string(),
                count,
                value,
                spend,
            })
            .collect()
    }
}

#[derive(Default)]
struct CampaignAccumulator {
    totals: MetricTotals,
    by_type: TypeAccumulator,
    type_counts: Vec<(ResultType, f64)>,
}

impl CampaignAccumulator {
    fn bump_type(&mut self, result_type: ResultType, count: f64) {
        match self.type_counts.iter_mut().find(|(t, _)| *t == result_type) {
            Some(entry) => entry.1 += count,
            None => self.type_counts.push((result_type, count)),
        }
    }

    /// Type with the highest count; ties keep the first-seen type.
    fn primary_type(&self) -> ResultType {
        self.type_counts
            .iter()
            .fold(None::<(ResultType, f64)>, |best, &(t, c)| match best {
                Some((_, best_count)) if best_count >= c => best,
                _ => Some((t, c)),
            })
            .map(|(t, _)| t)
            .unwrap_or(ResultType::Other)
    }
}

/// Fold parsed rows into one channel's normalized data set. Accumulates the
/// channel, campaign and daily grains simultaneously from each row.
pub fn aggregate_rows(
    table: &ParsedTable,
    columns: &ResolvedColumns,
    platform: Platform,
    currency: &str,
) -> ChannelData {
    let mut totals = MetricTotals::default();
    let mut channel_types = TypeAccumulator::default();
    let mut campaigns: Vec<(String, CampaignAccumulator)> = Vec::new();
    let mut daily: Vec<(NaiveDate, MetricTotals)> = Vec::new();

    for row in &table.rows {
        let metrics = extract_row(row, columns);
        let row_totals = MetricTotals {
            spend: metrics.spend,
            revenue: metrics.revenue,
            results: metrics.results,
            impressions: metrics.impressions,
            clicks: metrics.clicks,
        };

        totals.add(&row_totals);
        if metrics.results > 0.0 {
            channel_types.add(
                metrics.result_type,
                metrics.results,
                metrics.revenue,
                metrics.spend,
            );
        }

        // Rows without a campaign cell still count toward channel totals.
        if let Some(name) = &metrics.campaign {
            let index = match campaigns.iter().position(|(n, _)| n == name) {
                Some(index) => index,
                None => {
                    campaigns.push((name.clone(), CampaignAccumulator::default()));
                    campaigns.len() - 1
                }
            };
            let accumulator = &mut campaigns[index].1;
            accumulator.totals.add(&row_totals);
            if metrics.results > 0.0 {
                accumulator.by_type.add(
                    metrics.result_type,
                    metrics.results,
                    metrics.revenue,
                    metrics.spend,
                );
                accumulator.bump_type(metrics.result_type, metrics.results);
            }
        }

        // Rows with unparsable dates are excluded from the daily grain only.
        if let Some(date) = metrics.date {
            match daily.iter_mut().find(|(d, _)| *d == date) {
                Some((_, day_totals)) => day_totals.add(&row_totals),
                None => daily.push((date, row_totals)),
            }
        }
    }

    let mut campaign_list: Vec<CampaignData> = campaigns
        .into_iter()
        .map(|(name, acc)| CampaignData {
            name,
            ratios: DerivedRatios::from_totals(&acc.totals),
            primary_result_type: acc.primary_type(),
            results_by_type: acc.by_type.into_results(),
            totals: acc.totals,
        })
        .collect();
    // Descending by results; stable sort keeps first-seen order on ties.
    campaign_list.sort_by(|a, b| {
        b.totals
            .results
            .partial_cmp(&a.totals.results)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    daily.sort_by_key(|(date, _)| *date);
    let daily_list: Vec<DailyMetrics> = daily
        .into_iter()
        .map(|(date, t)| DailyMetrics {
            date,
            spend: t.spend,
            revenue: t.revenue,
            results: t.results,
            impressions: t.impressions,
            clicks: t.clicks,
        })
        .collect();

    ChannelData {
        platform,
        currency: currency.to_string(),
        ratios: DerivedRatios::from_totals(&totals),
        totals,
        campaigns: campaign_list,
        daily: daily_list,
        results_by_type: channel_types.into_results(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::resolve_columns;
    use crate::parser::{parse_table, FileFormat};

    fn import(csv: &[u8], platform: Platform) -> ChannelData {
        let table = parse_table(csv, FileFormat::Delimited, platform).unwrap();
        let columns = resolve_columns(&table.headers, platform).unwrap();
        aggregate_rows(&table, &columns, platform, "USD")
    }

    #[test]
    fn numeric_normalization_strips_symbols() {
        assert_eq!(parse_numeric("$1,234.56"), 1234.56);
        assert_eq!(parse_numeric(" 1 234 "), 1234.0);
        assert_eq!(parse_numeric("12.5%"), 12.5);
        assert_eq!(parse_numeric("-3.2"), -3.2);
        assert_eq!(parse_numeric("n/a"), 0.0);
        assert_eq!(parse_numeric(""), 0.0);
    }

    #[test]
    fn date_normalization_prefers_iso() {
        assert_eq!(
            parse_date("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("01/15/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("Jan 15, 2024"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn end_to_end_two_row_import() {
        let csv = b"Date,Campaign,Cost,Impressions,Clicks,Results\n\
                    2024-01-01,Brand,100,1000,10,2\n\
                    2024-01-02,Brand,200,2000,30,8\n";
        let channel = import(csv, Platform::Google);

        assert_eq!(channel.totals.spend, 300.0);
        assert_eq!(channel.totals.impressions, 3000.0);
        assert_eq!(channel.totals.clicks, 40.0);
        assert_eq!(channel.totals.results, 10.0);
        assert_eq!(channel.ratios.cost_per_result, 30.0);
        assert!((channel.ratios.ctr - 40.0 / 3000.0 * 100.0).abs() < 1e-9);

        assert_eq!(channel.daily.len(), 2);
        assert_eq!(channel.daily[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(channel.daily[1].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn preambled_tab_export_sums_real_cells() {
        // A tab-separated export behind a title preamble must not collapse
        // each row into one cell and sum concatenated digits.
        let csv =
            b"Google Ads report\nJan 1 - Jan 31\nCampaign\tCost\tImpressions\nBrand\t10\t100\n";
        let channel = import(csv, Platform::Google);
        assert_eq!(channel.totals.spend, 10.0);
        assert_eq!(channel.totals.impressions, 100.0);
        assert_eq!(channel.campaigns.len(), 1);
        assert_eq!(channel.campaigns[0].name, "Brand");
    }

    #[test]
    fn campaigns_accumulate_by_name_and_sort_by_results() {
        let csv = b"Campaign,Cost,Impressions,Results\n\
                    Alpha,10,100,1\n\
                    Beta,20,200,5\n\
                    Alpha,30,300,2\n";
        let channel = import(csv, Platform::Google);

        assert_eq!(channel.campaigns.len(), 2);
        assert_eq!(channel.campaigns[0].name, "Beta");
        assert_eq!(channel.campaigns[1].name, "Alpha");
        assert_eq!(channel.campaigns[1].totals.spend, 40.0);
        assert_eq!(channel.campaigns[1].totals.results, 3.0);
    }

    #[test]
    fn campaign_sort_ties_keep_first_seen_order() {
        let csv = b"Campaign,Cost,Impressions,Results\n\
                    First,10,100,3\n\
                    Second,20,200,3\n";
        let channel = import(csv, Platform::Google);
        assert_eq!(channel.campaigns[0].name, "First");
        assert_eq!(channel.campaigns[1].name, "Second");
    }

    #[test]
    fn rows_without_campaign_still_hit_channel_totals() {
        let csv = b"Campaign,Cost,Impressions\n\
                    ,50,500\n\
                    Named,25,250\n";
        let channel = import(csv, Platform::Google);
        assert_eq!(channel.totals.spend, 75.0);
        assert_eq!(channel.campaigns.len(), 1);
        assert_eq!(channel.campaigns[0].totals.spend, 25.0);
    }

    #[test]
    fn unparsable_dates_drop_from_daily_only() {
        let csv = b"Date,Campaign,Cost,Impressions\n\
                    2024-03-01,A,10,100\n\
                    whenever,A,20,200\n";
        let channel = import(csv, Platform::Google);
        assert_eq!(channel.daily.len(), 1);
        assert_eq!(channel.totals.spend, 30.0);
    }

    #[test]
    fn bad_numeric_cells_count_as_zero() {
        let csv = b"Campaign,Cost,Impressions\n\
                    A,garbage,100\n\
                    A,50,200\n";
        let channel = import(csv, Platform::Google);
        assert_eq!(channel.totals.spend, 50.0);
        assert_eq!(channel.totals.impressions, 300.0);
    }

    #[test]
    fn results_fall_back_to_conversions_column() {
        let csv = b"Campaign,Cost,Impressions,Conversions\n\
                    A,10,100,4\n";
        let channel = import(csv, Platform::Google);
        assert_eq!(channel.totals.results, 4.0);
    }

    #[test]
    fn results_by_type_only_counts_rows_with_results() {
        let csv = b"Campaign,Cost,Impressions,Results,Result type\n\
                    A,10,100,3,Website purchases\n\
                    A,20,200,0,Website purchases\n\
                    B,5,50,2,Leads\n";
        let channel = import(csv, Platform::Meta);

        assert_eq!(channel.results_by_type.len(), 2);
        let purchases = &channel.results_by_type[0];
        assert_eq!(purchases.result_type, ResultType::Purchase);
        assert_eq!(purchases.count, 3.0);
        assert_eq!(purchases.spend, 10.0);

        // Campaign-level counts sum to the channel-level count per type.
        let campaign_total: f64 = channel
            .campaigns
            .iter()
            .flat_map(|c| &c.results_by_type)
            .filter(|r| r.result_type == ResultType::Purchase)
            .map(|r| r.count)
            .sum();
        assert_eq!(campaign_total, purchases.count);
    }

    #[test]
    fn primary_result_type_is_highest_count() {
        let csv = b"Campaign,Cost,Impressions,Results,Result type\n\
                    A,10,100,2,Leads\n\
                    A,10,100,5,Website purchases\n";
        let channel = import(csv, Platform::Meta);
        assert_eq!(channel.campaigns[0].primary_result_type, ResultType::Purchase);
    }

    #[test]
    fn zero_rows_of_signal_still_produce_zero_ratios() {
        let csv = b"Campaign,Cost,Impressions\n\
                    A,0,0\n";
        let channel = import(csv, Platform::Google);
        assert_eq!(channel.ratios.roas, 0.0);
        assert_eq!(channel.ratios.cost_per_result, 0.0);
        assert_eq!(channel.ratios.cpm, 0.0);
        assert_eq!(channel.ratios.cpc, 0.0);
        assert_eq!(channel.ratios.ctr, 0.0);
    }
}
