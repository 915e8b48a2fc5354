//! Tariff data: wire types, the upstream endpoint, the EVCC view and lookups

pub mod api;
pub mod derive;
pub mod lookup;
pub mod types;

pub use api::{fetch_tariff_body, parse_tariffs, tariff_request, tariff_url};
pub use derive::{derive_hourly, in_unit, relabel_utc};
pub use lookup::{TariffLookup, UNAVAILABLE_TARIFF, lookup};
pub use types::{AverageTariff, Detail, HourlyPrice, ProductKind, TariffPeriod, TariffProduct};
