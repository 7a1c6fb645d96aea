//! Property-based tests for pairwise and group sessions.

use olmkit::{
    Account, InboundGroupSession, OlmMessage, OutboundGroupSession, PreKeyMessage, Session,
    X25519PublicKey,
};
use proptest::prelude::*;

fn session_pair() -> (Session, Session) {
    let alice = Account::new(None).unwrap();
    let mut bob = Account::new(None).unwrap();
    bob.generate_one_time_keys(1).unwrap();
    let one_time_key =
        X25519PublicKey::from_base64(bob.one_time_keys().values().next().unwrap()).unwrap();

    let mut alice_session = alice
        .create_outbound_session(&bob.curve25519_key(), &one_time_key)
        .unwrap();
    let first = alice_session.encrypt(b"hello").unwrap();
    let mut bob_session = bob
        .create_inbound_session(&PreKeyMessage::from_bytes(&first.body()).unwrap())
        .unwrap();
    bob_session.decrypt(&first).unwrap();

    (alice_session, bob_session)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any plaintext survives a trip in either direction.
    #[test]
    fn pairwise_roundtrip(
        plaintexts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 1..8),
        alice_first in any::<bool>(),
    ) {
        let (mut alice, mut bob) = session_pair();

        for (i, plaintext) in plaintexts.iter().enumerate() {
            let (sender, receiver) = if (i % 2 == 0) == alice_first {
                (&mut alice, &mut bob)
            } else {
                (&mut bob, &mut alice)
            };

            let message = sender.encrypt(plaintext).unwrap();
            let wire = OlmMessage::from_base64(&message.to_base64()).unwrap();
            prop_assert_eq!(&receiver.decrypt(&wire).unwrap(), plaintext);
        }
    }

    /// A batch delivered in any order decrypts completely, each message once.
    #[test]
    fn pairwise_any_delivery_order(order in Just((0..10usize).collect::<Vec<_>>()).prop_shuffle()) {
        let (mut alice, mut bob) = session_pair();
        let messages: Vec<OlmMessage> = (0..10)
            .map(|i| alice.encrypt(&[i as u8]).unwrap())
            .collect();

        for i in order {
            prop_assert_eq!(bob.decrypt(&messages[i]).unwrap(), vec![i as u8]);
            prop_assert!(bob.decrypt(&messages[i]).is_err());
        }
    }

    /// Jumping the receiver straight to an index agrees with following along.
    #[test]
    fn group_decrypts_at_any_index(
        skip in 0u32..600,
        plaintext in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let mut outbound = OutboundGroupSession::new().unwrap();
        let mut follower = InboundGroupSession::new(&outbound.session_key()).unwrap();
        let mut jumper = InboundGroupSession::new(&outbound.session_key()).unwrap();

        for _ in 0..skip {
            let message = outbound.encrypt(b"filler").unwrap();
            follower.decrypt(&message).unwrap();
        }

        let message = outbound.encrypt(&plaintext).unwrap();
        let followed = follower.decrypt(&message).unwrap();
        let jumped = jumper.decrypt(&message).unwrap();

        prop_assert_eq!(followed.message_index, skip);
        prop_assert_eq!(&followed, &jumped);
        prop_assert_eq!(jumped.plaintext, plaintext);
    }

    /// An export at `index` decrypts from there on and nothing earlier.
    #[test]
    fn group_export_boundary(index in 0u32..40) {
        let mut outbound = OutboundGroupSession::new().unwrap();
        let inbound = InboundGroupSession::new(&outbound.session_key()).unwrap();
        let messages: Vec<String> = (0..41).map(|_| outbound.encrypt(b"x").unwrap()).collect();

        let mut imported = InboundGroupSession::import(&inbound.export_at(index).unwrap()).unwrap();
        prop_assert_eq!(imported.first_known_index(), index);
        prop_assert_eq!(imported.decrypt(&messages[index as usize]).unwrap().message_index, index);
        if index > 0 {
            prop_assert!(imported.decrypt(&messages[index as usize - 1]).is_err());
        }
    }
}
