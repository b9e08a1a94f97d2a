#![no_main]

use libfuzzer_sys::fuzz_target;
use snp_tally::Format;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    // Every layout must reject bad input with an error, never a panic
    for format in Format::ALL {
        if let Ok(record) = format.parse_line(&input) {
            assert!(!record.variant_id.is_empty());
            assert!(!record.genotype.is_empty());
            let _ = record.to_string();
        }
    }
});
