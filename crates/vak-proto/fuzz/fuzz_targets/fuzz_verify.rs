#![no_main]
use libfuzzer_sys::fuzz_target;
use vak_proto::testing::TestAuthority;
use vak_proto::{Nonce, verify_response};

fuzz_target!(|data: &[u8]| {
    // Mutated responses must be rejected without panicking. A genuine
    // response is spliced in so the fuzzer reaches the later gates.
    let nonce = Nonce::from_bytes([0x11; 64]);
    let authority = TestAuthority::new([0x22; 32]);
    let mut response = authority.respond(&nonce, 7);
    for (i, b) in data.iter().enumerate().take(response.len()) {
        response[i] ^= b;
    }
    let ok = verify_response(&nonce, &response, &authority.public_key(), 7).is_ok();
    if data.iter().all(|&b| b == 0) {
        assert!(ok);
    }
    let _ = verify_response(&nonce, data, &authority.public_key(), 0);
});
