#[macro_use]
extern crate afl;
use olmkit::{Account, OlmMessage, PreKeyMessage, Session, X25519PublicKey};

fn get_session() -> Session {
    // The Victim
    let mut alice = Account::new(None).expect("Setup failed");
    alice.generate_one_time_keys(1).expect("Setup failed");
    let one_time_key = alice.one_time_keys().values().next().cloned().expect("Setup failed");

    // The Attacker context
    let bob = Account::new(None).expect("Setup failed");
    let mut bob_session = bob
        .create_outbound_session(
            &alice.curve25519_key(),
            &X25519PublicKey::from_base64(&one_time_key).expect("Setup failed"),
        )
        .expect("Setup failed");
    let first = bob_session.encrypt(b"setup").expect("Setup failed");

    let mut session = alice
        .create_inbound_session(&PreKeyMessage::from_bytes(&first.body()).expect("Setup failed"))
        .expect("Setup failed");
    session.decrypt(&first).expect("Setup failed");
    session
}

fn main() {
    let mut session = get_session();

    fuzz!(|data: &[u8]| {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(message) = OlmMessage::from_base64(text) {
                let _ = session.decrypt(&message);
            }
        }
    });
}
