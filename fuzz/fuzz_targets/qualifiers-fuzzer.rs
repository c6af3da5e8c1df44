#![no_main]

use libfuzzer_sys::fuzz_target;
use restable_arsc::structs::ResTableConfig;

fuzz_target!(|data: &str| {
    // anything that parses prints back to a stable form
    if let Ok(config) = data.parse::<ResTableConfig>() {
        let printed = config.to_string();
        if let Ok(reparsed) = printed.parse::<ResTableConfig>() {
            assert_eq!(reparsed.to_string(), printed);
        }
    }
});
