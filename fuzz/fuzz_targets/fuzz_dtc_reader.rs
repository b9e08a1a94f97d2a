#![no_main]

use libfuzzer_sys::fuzz_target;
use snp_tally::{Format, Selection, dtc};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let format = Format::ALL[selector as usize % Format::ALL.len()];
    let selection = Selection::default().with_chromosome_range(1, Some(22));

    let reader = dtc::Reader::new(Cursor::new(body), format);

    // Iterate all lines - should never panic
    for line in reader.take(1000) {
        if let Ok(dtc::Line::Parsed(record)) = line {
            let _ = selection.accepts(&record);
            let _ = selection.is_past_end(&record);
        }
    }
});
