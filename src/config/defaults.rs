use super::*;

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            use_known_values: false,
            scrape_page_url:
                "https://www.vattenfall.nl/klantenservice/alles-over-je-dynamische-contract/"
                    .to_string(),
            known_api_base_url: String::new(),
            known_api_key: String::new(),
            refresh_interval_seconds: MIN_REFRESH_INTERVAL_SECONDS,
            scrape_timeout_seconds: 10,
            api_timeout_seconds: 30,
            evcc_unit: PriceUnit::Currency,
            timezone: "Europe/Amsterdam".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            http_level: "WARN".to_string(),
            file: String::new(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}
