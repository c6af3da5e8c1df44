#![no_main]

use libfuzzer_sys::fuzz_target;
use restable_arsc::LoadedIdmap;

fuzz_target!(|data: &[u8]| {
    let _ = LoadedIdmap::load(data);
});
