#![no_main]
use flexprice::scrape::ScriptPatterns;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let Ok(patterns) = ScriptPatterns::new() else {
        return;
    };

    let _ = patterns.script_url(&text);
    if let Ok(base) = patterns.api_base_url(&text) {
        assert!(!base.ends_with('/'));
    }
    let _ = patterns.api_key(&text);
});
