#![no_main]

use libfuzzer_sys::fuzz_target;
use restable_arsc::XmlTree;

fuzz_target!(|data: &[u8]| {
    // must provide at least 8 bytes
    if data.len() < 8 {
        return;
    }

    let Ok(tree) = XmlTree::load(data) else {
        return;
    };

    let mut parser = tree.parser(None);
    while parser.next_element().is_some() {
        for idx in 0..parser.attribute_count() {
            let _ = parser.attribute_name(idx);
            let _ = parser.attribute_name_resid(idx);
            let _ = parser.attribute_value(idx);
            let _ = parser.attribute_string_value(idx);
        }
    }
});
