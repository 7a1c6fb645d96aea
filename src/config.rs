/// Capacity of the one-time key pool an account keeps by default.
pub const MAX_ONE_TIME_KEYS: usize = 100;

/// Limits applied to the double ratchet of a pairwise session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Message keys kept for messages that were skipped over; oldest are dropped first.
    pub max_skipped_message_keys: usize,
    /// Receiving chains kept for late messages from earlier ratchet turns.
    pub max_receiver_chains: usize,
    /// Largest forward jump within one chain a single message may request.
    pub max_message_gap: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_skipped_message_keys: 40,
            max_receiver_chains: 5,
            max_message_gap: 2000,
        }
    }
}

/// Settings for an [`Account`](crate::Account) and the sessions it creates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountConfig {
    /// Upper bound of stored one-time keys; generating past it evicts the oldest.
    pub max_one_time_keys: usize,
    /// Ratchet limits handed to every session created from this account.
    pub session: SessionConfig,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            max_one_time_keys: MAX_ONE_TIME_KEYS,
            session: SessionConfig::default(),
        }
    }
}
