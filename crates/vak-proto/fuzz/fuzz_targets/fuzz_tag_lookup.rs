#![no_main]
use libfuzzer_sys::fuzz_target;
use vak_proto::tag;
use vak_proto::wire::{WordSlice, unframe};

fuzz_target!(|data: &[u8]| {
    // Lookups on arbitrary words must not panic.
    let body = unframe(data).unwrap_or(data);
    let aligned = &body[..body.len() - body.len() % 4];
    if let Ok(msg) = WordSlice::new(aligned) {
        let _ = msg.check_tag_order();
        for t in [tag::SREP, tag::SIG, tag::CERT, tag::INDX, tag::PATH, tag::MIDP] {
            if let Ok(value) = msg.get_tag(t) {
                let _ = value.get_tag(tag::DELE);
                let _ = value.read_u64(0);
            }
        }
        if let Ok(tags) = msg.tags() {
            for entry in tags {
                let _ = entry;
            }
        }
    }
});
