//! Declarative vocabulary: canonical fields with their aliases, detection
//! keywords, known markets and platform alias tables. New aliases are data,
//! so they can be added from configuration without code changes.

use serde::Deserialize;
use serde::Serialize;

/// Whether a canonical field labels a row or carries a value
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Describes the row (market, platform, campaign, dates)
    Dimension,
    /// Numeric value column; one record per cell
    Metric,
}

/// Declared unit of a field's values
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Count,
    Currency,
    /// Percentage points: `1.5%` and `1.5` both mean 1.5
    Percent,
    Ratio,
    #[default]
    Text,
}

impl Unit {
    /// Units for which negative values are flagged
    pub fn is_count_like(&self) -> bool {
        matches!(self, Unit::Count | Unit::Currency)
    }
}

/// One canonical field and the header texts that name it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub role: FieldRole,
    #[serde(default)]
    pub unit: Unit,
}

impl FieldSpec {
    pub fn dimension(name: &str, aliases: &[&str]) -> Self {
        FieldSpec {
            name: name.to_owned(),
            aliases: to_strings(aliases),
            role: FieldRole::Dimension,
            unit: Unit::Text,
        }
    }

    pub fn metric(name: &str, unit: Unit, aliases: &[&str]) -> Self {
        FieldSpec {
            name: name.to_owned(),
            aliases: to_strings(aliases),
            role: FieldRole::Metric,
            unit,
        }
    }
}

/// Canonical platform name and the spellings that identify it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlatformSpec {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Vocabulary {
    /// Column fields of ordinary tables
    pub fields: Vec<FieldSpec>,
    /// Metric row labels of reach & frequency blocks
    pub rf_metrics: Vec<FieldSpec>,
    /// Header keywords counted by identifier-based detection
    pub identifier_keywords: Vec<String>,
    /// Header texts announcing a market column
    pub market_indicators: Vec<String>,
    /// Known market names
    pub markets: Vec<String>,
    pub platforms: Vec<PlatformSpec>,
    /// Sheet or workbook name keywords of reach & frequency reports
    pub rf_keywords: Vec<String>,
    /// Sheet or workbook name keywords of delivery reports
    pub delivery_keywords: Vec<String>,
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary {
            fields: vec![
                FieldSpec::dimension("MARKET", &["market", "markets", "country", "countries", "geo", "geography", "region", "metrics / market"]),
                FieldSpec::dimension("PLATFORM", &["platform", "channel", "media", "publisher", "partner", "site", "vendor"]),
                FieldSpec::dimension("CAMPAIGN", &["campaign", "campaign name", "activity", "line item", "placement"]),
                FieldSpec::dimension("START_DATE", &["start date", "start", "flight start", "launch date"]),
                FieldSpec::dimension("END_DATE", &["end date", "end", "flight end"]),
                FieldSpec::dimension("FORMAT", &["format", "ad format", "creative", "creative format", "buy type", "objective"]),
                FieldSpec::metric("BUDGET", Unit::Currency, &["budget", "spend", "media spend", "net budget", "gross budget", "budget usd", "cost", "investment", "net cost"]),
                FieldSpec::metric("IMPRESSIONS", Unit::Count, &["impressions", "impression", "imps", "impr", "est impressions", "estimated impressions"]),
                FieldSpec::metric("CLICKS", Unit::Count, &["clicks", "click", "link clicks", "est clicks"]),
                FieldSpec::metric("CTR", Unit::Percent, &["ctr", "ctr %", "click through rate", "click-through rate"]),
                FieldSpec::metric("CPM", Unit::Currency, &["cpm", "cost per mille", "cost per thousand"]),
                FieldSpec::metric("CPC", Unit::Currency, &["cpc", "cost per click"]),
                FieldSpec::metric("VIEWS", Unit::Count, &["views", "video views", "completed views", "thruplays"]),
                FieldSpec::metric("VTR", Unit::Percent, &["vtr", "vtr %", "view through rate", "completion rate"]),
                FieldSpec::metric("REACH", Unit::Count, &["reach", "unique reach", "uniques"]),
                FieldSpec::metric("REACH_PERCENT", Unit::Percent, &["reach %", "reach percent", "% reach"]),
                FieldSpec::metric("FREQUENCY", Unit::Ratio, &["frequency", "freq", "avg frequency", "average frequency"]),
                FieldSpec::metric("CONVERSIONS", Unit::Count, &["conversions", "conversion", "leads", "installs"]),
            ],
            rf_metrics: vec![
                FieldSpec::metric("UNIQUES_REACH", Unit::Count, &["campaign reach (absl)", "campaign reach", "reach (absl)", "absolute reach", "uniques", "unique reach", "reach"]),
                FieldSpec::metric("REACH_PERCENT", Unit::Percent, &["campaign reach (%)", "reach (%)", "reach %", "% reach"]),
                FieldSpec::metric("FREQUENCY", Unit::Ratio, &["frequency", "avg frequency", "average frequency", "campaign frequency"]),
                FieldSpec::metric("IMPRESSIONS", Unit::Count, &["impressions", "total impressions"]),
            ],
            identifier_keywords: to_strings(&[
                "impressions", "clicks", "budget", "market", "platform", "ctr", "cpm", "cpc", "views", "vtr",
                "reach", "frequency", "spend", "campaign", "country", "conversions", "start date", "end date",
            ]),
            market_indicators: to_strings(&["market", "markets", "country", "geo", "metrics / market"]),
            markets: to_strings(&[
                "UAE", "KSA", "Saudi Arabia", "Qatar", "Kuwait", "Bahrain", "Oman", "Egypt", "Jordan", "Lebanon",
                "Iraq", "Morocco", "Algeria", "Tunisia", "Turkey", "Pakistan", "India", "UK", "US", "USA",
                "France", "Germany", "Italy", "Spain", "MENA", "GCC", "Levant", "Total",
            ]),
            platforms: vec![
                PlatformSpec { name: "META".to_owned(), aliases: to_strings(&["meta", "facebook", "instagram", "fb", "ig"]) },
                PlatformSpec { name: "GOOGLE".to_owned(), aliases: to_strings(&["google", "dv360", "youtube", "yt", "google ads", "gdn", "search"]) },
                PlatformSpec { name: "SNAPCHAT".to_owned(), aliases: to_strings(&["snapchat", "snap"]) },
                PlatformSpec { name: "TIKTOK".to_owned(), aliases: to_strings(&["tiktok", "tik tok"]) },
                PlatformSpec { name: "X".to_owned(), aliases: to_strings(&["twitter", "x.com"]) },
                PlatformSpec { name: "LINKEDIN".to_owned(), aliases: to_strings(&["linkedin"]) },
            ],
            rf_keywords: to_strings(&["r&f", "reach and frequency", "reach & frequency", "reach"]),
            delivery_keywords: to_strings(&["delivery", "delivered", "pca", "actual", "actuals", "report", "post campaign"]),
        }
    }
}
