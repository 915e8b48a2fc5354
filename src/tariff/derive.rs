use super::types::{HourlyPrice, ProductKind, TariffProduct};
use crate::config::PriceUnit;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use rust_decimal::Decimal;

/// Tag a wall-clock value as UTC without shifting it; sub-second precision is dropped
pub fn relabel_utc(local: NaiveDateTime) -> DateTime<Utc> {
    local.with_nanosecond(0).unwrap_or(local).and_utc()
}

/// Upstream amount expressed in `unit`
///
/// Scaling works on the shortest decimal form of `amount`, so `0.07` EUR is
/// exactly `7` cents. Amounts outside the decimal range are scaled as floats.
pub fn in_unit(amount: f64, unit: PriceUnit) -> f64 {
    let factor = unit.factor();
    if factor == 1 {
        return amount;
    }
    amount
        .to_string()
        .parse::<Decimal>()
        .ok()
        .and_then(|d| d.checked_mul(Decimal::from(factor)))
        .and_then(|d| d.normalize().to_string().parse::<f64>().ok())
        .unwrap_or_else(|| amount * f64::from(factor))
}

/// Hourly view of the first electricity product, ascending by start
///
/// `None` when the snapshot has no electricity product.
pub fn derive_hourly(products: &[TariffProduct], unit: PriceUnit) -> Option<Vec<HourlyPrice>> {
    let electricity = products
        .iter()
        .find(|p| p.kind() == Some(ProductKind::Electricity))?;

    let mut hourly: Vec<HourlyPrice> = electricity
        .tariff_data
        .iter()
        .map(|period| HourlyPrice {
            start: relabel_utc(period.start_time),
            end: relabel_utc(period.end_time),
            value: in_unit(period.amount_incl_vat, unit),
        })
        .collect();
    hourly.sort_by_key(|h| h.start);
    Some(hourly)
}
