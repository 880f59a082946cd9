/// Bounds applied to every sender key record handled by a member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupConfig {
    /// How many iterations a message may jump ahead of the receiving chain.
    pub max_future_messages: u32,
    /// Skipped message keys kept per state; the lowest iterations are evicted first.
    pub max_message_keys: usize,
    /// Sender key states kept per record; the oldest are evicted first.
    pub max_states: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            max_future_messages: 2000,
            max_message_keys: 2000,
            max_states: 5,
        }
    }
}
