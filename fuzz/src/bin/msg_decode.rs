#[macro_use]
extern crate afl;
use olmkit::{MessageType, OlmMessage};

fn main() {
    fuzz!(|data: &[u8]| {
        if let Ok(text) = std::str::from_utf8(data) {
            let _ = OlmMessage::from_base64(text);
        }
        let _ = OlmMessage::from_parts(MessageType::Normal, data);
        let _ = OlmMessage::from_parts(MessageType::PreKey, data);
    });
}
