use super::{SenderChainKey, SenderKeyDistributionMessage, SenderKeyName, SenderKeyState};
use crate::{Error, GroupConfig, KeyStore};

/// Creates and processes sender key distribution messages.
pub struct GroupSessionBuilder<'a, S: KeyStore + ?Sized> {
    store: &'a mut S,
    config: GroupConfig,
}

impl<'a, S: KeyStore + ?Sized> GroupSessionBuilder<'a, S> {
    /// Creates a builder with the default bounds.
    pub fn new(store: &'a mut S) -> Self {
        Self::with_config(store, GroupConfig::default())
    }

    /// Creates a builder with custom bounds.
    pub fn with_config(store: &'a mut S, config: GroupConfig) -> Self {
        Self { store, config }
    }

    /// Returns the distribution message for this identity's sending state.
    ///
    /// A fresh state is originated and persisted first if there is none.
    pub fn create(&mut self, name: &SenderKeyName) -> Result<SenderKeyDistributionMessage, Error> {
        let mut record = self.store.load_sender_key(name)?;

        if record.sending_state().is_none() {
            let state = SenderKeyState::generate()?;
            tracing::debug!(%name, key_id = state.key_id(), "Originated sender key state");

            record.add_state(state, self.config.max_states);
            self.store.store_sender_key(name, &record)?;
        }

        let state = record
            .sending_state()
            .ok_or_else(|| Error::NoSession(name.to_string()))?;
        let chain_key = state.chain_key();

        Ok(SenderKeyDistributionMessage::new(
            state.key_id(),
            chain_key.iteration(),
            chain_key.seed(),
            *state.signing_key_public(),
        ))
    }

    /// Seeds the record for `name` from a peer's distribution message.
    ///
    /// Processing the same distribution again changes nothing, and a state
    /// holding our own private signing key is never replaced.
    pub fn process(
        &mut self,
        name: &SenderKeyName,
        distribution: &SenderKeyDistributionMessage,
    ) -> Result<(), Error> {
        let mut record = self.store.load_sender_key(name)?;

        if let Some(existing) = record.state(distribution.key_id()) {
            if existing.has_signing_key_private() {
                tracing::debug!(
                    %name,
                    key_id = distribution.key_id(),
                    "Ignoring distribution for own sender key state"
                );
                return Ok(());
            }

            if existing.signing_key_public() == distribution.signing_key()
                && existing.chain_key().iteration() >= distribution.iteration()
            {
                // Already at or past this chain position
                return Ok(());
            }
        }

        let state = SenderKeyState::new(
            distribution.key_id(),
            SenderChainKey::new(
                distribution.iteration(),
                Box::new(*distribution.chain_key()),
            ),
            *distribution.signing_key(),
            None,
        );
        record.add_state(state, self.config.max_states);
        self.store.store_sender_key(name, &record)?;

        tracing::debug!(
            %name,
            key_id = distribution.key_id(),
            iteration = distribution.iteration(),
            "Processed sender key distribution"
        );

        Ok(())
    }
}
