#[macro_use]
extern crate afl;
use olmkit::{InboundGroupSession, OutboundGroupSession};

fn main() {
    let outbound = OutboundGroupSession::new().expect("Setup failed");
    let mut session = InboundGroupSession::new(&outbound.session_key()).expect("Setup failed");

    fuzz!(|data: &[u8]| {
        if let Ok(text) = std::str::from_utf8(data) {
            let _ = session.decrypt(text);
            let _ = InboundGroupSession::import(text);
        }
    });
}
