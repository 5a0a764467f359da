use serde::{Deserialize, Serialize};

/// Advertising platforms we know how to import. At most one `ChannelData`
/// exists per platform in a user's working set; re-importing replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Meta,
    Google,
    Tiktok,
    Linkedin,
    Other,
}

impl Platform {
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Meta => "Meta",
            Platform::Google => "Google Ads",
            Platform::Tiktok => "TikTok",
            Platform::Linkedin => "LinkedIn",
            Platform::Other => "Other",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Platform::Meta => "meta",
            Platform::Google => "google",
            Platform::Tiktok => "tiktok",
            Platform::Linkedin => "linkedin",
            Platform::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Platform> {
        match s.trim().to_lowercase().as_str() {
            "meta" | "facebook" => Some(Platform::Meta),
            "google" | "google ads" => Some(Platform::Google),
            "tiktok" => Some(Platform::Tiktok),
            "linkedin" => Some(Platform::Linkedin),
            "other" => Some(Platform::Other),
            _ => None,
        }
    }
}

/// Conversion-style outcomes, derived from free-text platform labels.
/// Anything we cannot classify maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Purchase,
    LandingPageView,
    Reach,
    Lead,
    LinkClick,
    VideoView,
    AppInstall,
    Message,
    Other,
}

impl ResultType {
    /// Substring heuristics over the platform's own label text, checked in
    /// a fixed order so "link click" wins before a bare "click" could.
    pub fn from_label(label: &str) -> ResultType {
        let text = label.trim().to_lowercase();
        if text.is_empty() {
            return ResultType::Other;
        }
        if text.contains("purchase") || text.contains("sale") {
            ResultType::Purchase
        } else if text.contains("landing") {
            ResultType::LandingPageView
        } else if text.contains("reach") {
            ResultType::Reach
        } else if text.contains("lead") {
            ResultType::Lead
        } else if text.contains("link click") || text.contains("click") {
            ResultType::LinkClick
        } else if text.contains("video") || text.contains("thruplay") {
            ResultType::VideoView
        } else if text.contains("install") {
            ResultType::AppInstall
        } else if text.contains("messag") {
            ResultType::Message
        } else {
            ResultType::Other
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ResultType::Purchase => "Purchases",
            ResultType::LandingPageView => "Landing page views",
            ResultType::Reach => "Reach",
            ResultType::Lead => "Leads",
            ResultType::LinkClick => "Link clicks",
            ResultType::VideoView => "Video views",
            ResultType::AppInstall => "App installs",
            ResultType::Message => "Messages",
            ResultType::Other => "Results",
        }
    }
}

/// Per-result-type accumulation, kept at both campaign and channel grain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsByType {
    pub result_type: ResultType,
    pub display_name: String,
    pub count: f64,
    pub value: f64,
    pub spend: f64,
}

/// One record per calendar date per channel, dates normalized to YYYY-MM-DD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: chrono::NaiveDate,
    pub spend: f64,
    pub revenue: f64,
    pub results: f64,
    pub impressions: f64,
    pub clicks: f64,
}

/// The raw sums every grain carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub spend: f64,
    pub revenue: f64,
    pub results: f64,
    pub impressions: f64,
    pub clicks: f64,
}

impl MetricTotals {
    pub fn add(&mut self, other: &MetricTotals) {
        self.spend += other.spend;
        self.revenue += other.revenue;
        self.results += other.results;
        self.impressions += other.impressions;
        self.clicks += other.clicks;
    }
}

/// Ratios derived once per grain from accumulated sums. Division by zero
/// always yields 0, never NaN or infinity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedRatios {
    pub roas: f64,
    pub cost_per_result: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub ctr: f64,
}

impl DerivedRatios {
    pub fn from_totals(t: &MetricTotals) -> DerivedRatios {
        DerivedRatios {
            roas: safe_div(t.revenue, t.spend),
            cost_per_result: safe_div(t.spend, t.results),
            cpm: safe_div(t.spend, t.impressions) * 1000.0,
            cpc: safe_div(t.spend, t.clicks),
            ctr: safe_div(t.clicks, t.impressions) * 100.0,
        }
    }
}

/// `numerator / denominator`, with 0 for a zero denominator.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Campaign identity is its display name scoped within one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignData {
    pub name: String,
    pub totals: MetricTotals,
    pub ratios: DerivedRatios,
    pub results_by_type: Vec<ResultsByType>,
    pub primary_result_type: ResultType,
}

/// One imported platform's normalized data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelData {
    pub platform: Platform,
    pub currency: String,
    pub totals: MetricTotals,
    pub ratios: DerivedRatios,
    pub campaigns: Vec<CampaignData>,
    pub daily: Vec<DailyMetrics>,
    pub results_by_type: Vec<ResultsByType>,
}

/// Per-channel entry in the cross-channel ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub platform: Platform,
    pub display_name: String,
    pub totals: MetricTotals,
    pub ratios: DerivedRatios,
}

/// A campaign surfaced by the cross-channel ranking. The two badge flags
/// are independent; the same campaign may carry both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCampaign {
    pub name: String,
    pub platform: Platform,
    pub spend: f64,
    pub revenue: f64,
    pub results: f64,
    pub roas: f64,
    pub cost_per_result: f64,
    pub is_top_performer: bool,
    pub is_most_efficient: bool,
}

/// One calendar month of the merged daily data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetrics {
    /// `YYYY-MM`
    pub month: String,
    pub spend: f64,
    pub revenue: f64,
    pub results: f64,
    pub impressions: f64,
    pub roas: f64,
    pub cost_per_result: f64,
    pub is_best_roas: bool,
    pub is_worst_roas: bool,
    pub is_best_cost_per_result: bool,
    pub is_worst_cost_per_result: bool,
}

/// The cross-channel reduction. A pure, recomputable projection of the set
/// of channels; it holds no independent state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedAdsData {
    /// First non-empty channel currency, passed through unmodified.
    pub currency: String,
    pub totals: MetricTotals,
    pub ratios: DerivedRatios,
    pub results_by_type: Vec<ResultsByType>,
    /// All channels, descending by spend (ties keep input order).
    pub channels: Vec<ChannelSummary>,
    pub top_channel: Option<Platform>,
    pub second_channel: Option<Platform>,
    /// Highest-ROAS channel among those spending at least 1% of the total.
    pub best_roas_channel: Option<Platform>,
    pub top_campaigns_by_revenue: Vec<RankedCampaign>,
    pub top_campaigns_by_roas: Vec<RankedCampaign>,
    pub most_efficient_campaign: Option<RankedCampaign>,
    pub monthly: Vec<MonthlyMetrics>,
}

/// Free-text and numeric fields a user may enter directly when a platform
/// export lacks them. Computed values take precedence when both exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualOverrides {
    pub revenue: Option<f64>,
    pub creative_highlights: Vec<String>,
    pub optimization_highlights: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_label_heuristics() {
        assert_eq!(ResultType::from_label("Website purchases"), ResultType::Purchase);
        assert_eq!(
            ResultType::from_label("Landing Page Views"),
            ResultType::LandingPageView
        );
        assert_eq!(ResultType::from_label("Link clicks"), ResultType::LinkClick);
        assert_eq!(ResultType::from_label("On-Facebook leads"), ResultType::Lead);
        assert_eq!(ResultType::from_label("ThruPlay"), ResultType::VideoView);
        assert_eq!(ResultType::from_label("App installs"), ResultType::AppInstall);
        assert_eq!(
            ResultType::from_label("Messaging conversations started"),
            ResultType::Message
        );
        assert_eq!(ResultType::from_label("something unknown"), ResultType::Other);
        assert_eq!(ResultType::from_label(""), ResultType::Other);
    }

    #[test]
    fn safe_div_guards_zero() {
        assert_eq!(safe_div(10.0, 0.0), 0.0);
        assert_eq!(safe_div(0.0, 0.0), 0.0);
        assert_eq!(safe_div(10.0, 4.0), 2.5);
    }

    #[test]
    fn ratios_all_zero_when_totals_empty() {
        let ratios = DerivedRatios::from_totals(&MetricTotals::default());
        assert_eq!(ratios, DerivedRatios::default());
    }

    #[test]
    fn platform_parse_accepts_aliases() {
        assert_eq!(Platform::parse("facebook"), Some(Platform::Meta));
        assert_eq!(Platform::parse("Google Ads"), Some(Platform::Google));
        assert_eq!(Platform::parse("unknown"), None);
    }
}
