use super::types::TariffProduct;
use chrono::NaiveDateTime;

/// Value reported when no tariff can be determined; reads as "very expensive"
pub const UNAVAILABLE_TARIFF: f64 = 999.0;

/// Result of a current-value lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TariffLookup {
    /// A period contains the instant
    Current(f64),
    /// No period contains the instant; carries the product's maximum
    OutsideSchedule(f64),
    /// The product exists but has no periods
    NoPeriods,
    /// No product with that code in the snapshot
    UnknownProduct,
}

impl TariffLookup {
    pub fn value(self) -> f64 {
        match self {
            Self::Current(v) | Self::OutsideSchedule(v) => v,
            Self::NoPeriods | Self::UnknownProduct => UNAVAILABLE_TARIFF,
        }
    }

    pub fn is_current(self) -> bool {
        matches!(self, Self::Current(_))
    }

    /// Operator-facing note for every result other than `Current`
    pub fn explain(self, code: &str, at: NaiveDateTime) -> Option<String> {
        match self {
            Self::Current(_) => None,
            Self::OutsideSchedule(max) => Some(format!(
                "No tariff period for product '{}' contains {}, using its maximum {}",
                code, at, max
            )),
            Self::NoPeriods => Some(format!(
                "Product '{}' is in the snapshot but has no tariff periods, using {}",
                code, UNAVAILABLE_TARIFF
            )),
            Self::UnknownProduct => Some(format!(
                "Product '{}' is not in the snapshot, using {}",
                code, UNAVAILABLE_TARIFF
            )),
        }
    }
}

/// First product with `code`, first period containing `at` (bounds inclusive)
pub fn lookup(products: &[TariffProduct], code: &str, at: NaiveDateTime) -> TariffLookup {
    let Some(product) = products.iter().find(|p| p.has_code(code)) else {
        return TariffLookup::UnknownProduct;
    };

    if let Some(period) = product.tariff_data.iter().find(|p| p.contains(at)) {
        return TariffLookup::Current(period.amount_incl_vat);
    }

    product
        .tariff_data
        .iter()
        .map(|p| p.amount_incl_vat)
        .reduce(f64::max)
        .map_or(TariffLookup::NoPeriods, TariffLookup::OutsideSchedule)
}
