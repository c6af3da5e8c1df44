#![no_main]

use libfuzzer_sys::fuzz_target;
use restable_arsc::structs::ResStringPool;

fuzz_target!(|data: &[u8]| {
    // must provide at least 28 bytes
    if data.len() < 28 {
        return;
    }

    if let Ok(pool) = ResStringPool::load(data) {
        for _ in pool.iter() {}
    }
});
