#![no_main]
use flexprice::config::PriceUnit;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };

    // Whatever parses must derive and look up without panicking
    if let Ok(products) = flexprice::tariff::parse_tariffs(body) {
        let _ = flexprice::tariff::derive_hourly(&products, PriceUnit::Cents);
        if let Some(first) = products.first().and_then(|p| p.tariff_data.first()) {
            let _ = flexprice::tariff::lookup(&products, "E", first.start_time);
        }
    }
});
