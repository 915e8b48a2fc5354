use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product line codes used by the tariff API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductKind {
    Electricity,
    Gas,
}

impl ProductKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Electricity => "E",
            Self::Gas => "G",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "E" => Some(Self::Electricity),
            "G" => Some(Self::Gas),
            _ => None,
        }
    }
}

/// One product line as returned by `GET /DynamicTariff`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default, rename_all = "camelCase")]
pub struct TariffProduct {
    pub product: Option<String>,
    pub name: Option<String>,
    pub product_code: Option<String>,
    pub tariff_data: Vec<TariffPeriod>,
    pub average_tariffs: Vec<AverageTariff>,
}

impl TariffProduct {
    pub fn kind(&self) -> Option<ProductKind> {
        self.product.as_deref().and_then(ProductKind::from_code)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.product.as_deref() == Some(code)
    }
}

/// A priced interval; `start_time`/`end_time` are local wall-clock values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default, rename_all = "camelCase")]
pub struct TariffPeriod {
    #[serde(deserialize_with = "wall_clock::deserialize")]
    pub start_time: NaiveDateTime,
    #[serde(deserialize_with = "wall_clock::deserialize")]
    pub end_time: NaiveDateTime,
    pub is_missing_period: bool,
    pub cheapest_of_day: bool,
    pub amount_incl_vat: f64,
    pub amount_excl_vat: f64,
    pub details: Vec<Detail>,
}

impl TariffPeriod {
    /// Both ends inclusive
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start_time <= at && at <= self.end_time
    }
}

/// Cost breakdown line, passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default, rename_all = "camelCase")]
pub struct Detail {
    pub amount: f64,
    pub amount_excl_vat: f64,
    pub amount_incl_vat: f64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default, rename_all = "camelCase")]
pub struct AverageTariff {
    #[serde(deserialize_with = "wall_clock::deserialize")]
    pub date: NaiveDateTime,
    pub amount_incl_vat: f64,
    pub amount_excl_vat: f64,
}

/// Entry of the EVCC-shaped hourly view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HourlyPrice {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub value: f64,
}

/// Lenient parsing of upstream local timestamps
pub(crate) mod wall_clock {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, de};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    /// Naive `YYYY-MM-DDTHH:MM:SS[.f]`; an explicit offset is dropped, keeping the wall clock
    pub fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT).or_else(|naive_err| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.naive_local())
                .map_err(|_| naive_err)
        })
    }
}
