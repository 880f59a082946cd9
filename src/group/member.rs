use super::{
    ChannelMessage, Directory, Envelope, JoinResponse, MAX_ENVELOPE_SIZE, PairwiseMessage,
    PairwiseSessions, PrivatePayload,
};
use crate::padding::{pad, unpad};
use crate::{
    DEFAULT_DEVICE_INDEX, Error, GroupCipher, GroupConfig, GroupSessionBuilder, KeyStore,
    PreKeyBundle, SenderKeyDistributionMessage, SenderKeyName,
};
use ed25519_dalek::SIGNATURE_LENGTH;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Something the embedding application has to carry out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Send this envelope on the group's channel.
    Send(Envelope),
    /// Show a decrypted channel message.
    Deliver {
        /// Identity of the sender.
        sender: String,
        /// The decrypted message.
        message: ChannelMessage,
    },
    /// The set of known channels grew; carries the full sorted list.
    ChannelsUpdated(Vec<String>),
}

/// Upper bound on the JSON length of a group envelope carrying `padded_len` bytes.
fn group_envelope_bound(sender: &str, padded_len: usize) -> usize {
    // version, two varint fields, ciphertext header, AEAD tag, signature
    let message_len = 1 + 2 * 6 + 4 + padded_len + 16 + SIGNATURE_LENGTH;
    let sender_len = serde_json::to_string(sender).map_or(sender.len() * 6 + 2, |s| s.len());
    r#"{"type":"group","sender":,"ciphertext":""}"#.len() + sender_len + message_len.div_ceil(3) * 4
}

/// One identity's view of one group.
///
/// A sans-IO driver: feed it every envelope the relay delivers, in order,
/// and carry out the returned [`Action`]s. Holding the store exclusively
/// serializes all sender key updates for the identity.
pub struct GroupMember<S, P, D> {
    identity: String,
    group_id: String,
    store: S,
    sessions: P,
    directory: D,
    config: GroupConfig,
    channels: BTreeSet<String>,
    bundles: HashMap<String, PreKeyBundle>,
    served: HashSet<String>,
}

impl<S: KeyStore, P: PairwiseSessions, D: Directory> GroupMember<S, P, D> {
    /// Creates the member state for `identity` in `group_id`.
    pub fn new(
        identity: impl Into<String>,
        group_id: impl Into<String>,
        store: S,
        sessions: P,
        directory: D,
    ) -> Self {
        Self {
            identity: identity.into(),
            group_id: group_id.into(),
            store,
            sessions,
            directory,
            config: GroupConfig::default(),
            channels: BTreeSet::new(),
            bundles: HashMap::new(),
            served: HashSet::new(),
        }
    }

    /// Replaces the sender key bounds.
    pub fn with_config(mut self, config: GroupConfig) -> Self {
        self.config = config;
        self
    }

    /// The local identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The group this member belongs to.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Known channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.channels.iter().cloned().collect()
    }

    /// Adds a channel locally; returns whether it was new.
    pub fn add_channel(&mut self, channel: impl Into<String>) -> bool {
        self.channels.insert(channel.into())
    }

    /// The key store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The pairwise session layer.
    pub fn sessions(&self) -> &P {
        &self.sessions
    }

    /// Name of `sender`'s ratchet in this group.
    pub fn sender_key_name(&self, sender: &str) -> SenderKeyName {
        SenderKeyName::new(self.group_id.clone(), sender, DEFAULT_DEVICE_INDEX)
    }

    /// Caches the bundles returned by the membership service on join.
    pub fn on_joined(&mut self, response: &JoinResponse) {
        for (identity, bundle) in &response.others {
            if *identity != self.identity {
                self.bundles.insert(identity.clone(), bundle.clone());
            }
        }
        tracing::debug!(
            identity = %self.identity,
            group_id = %self.group_id,
            members = self.bundles.len(),
            "Joined group"
        );
    }

    /// This identity's own distribution message, originating a sender key if needed.
    pub fn distribution(&mut self) -> Result<SenderKeyDistributionMessage, Error> {
        let name = self.sender_key_name(&self.identity);
        GroupSessionBuilder::with_config(&mut self.store, self.config.clone()).create(&name)
    }

    /// Encrypts a channel message for the whole group.
    pub fn send(&mut self, channel: &str, text: &str) -> Result<Envelope, Error> {
        let message = ChannelMessage {
            channel: channel.to_string(),
            text: text.to_string(),
        };
        let plaintext = serde_json::to_vec(&message).map_err(|err| Error::Serde(err.to_string()))?;
        let padded = pad(&plaintext)?;

        let bound = group_envelope_bound(&self.identity, padded.len());
        if bound > MAX_ENVELOPE_SIZE {
            return Err(Error::PayloadTooLarge(plaintext.len()));
        }

        self.distribution()?;
        let name = self.sender_key_name(&self.identity);
        let ciphertext =
            GroupCipher::with_config(&mut self.store, name, self.config.clone()).encrypt(&padded)?;

        Ok(Envelope::Group {
            sender: self.identity.clone(),
            ciphertext,
        })
    }

    /// Parses and handles one envelope from the relay.
    pub fn handle_json(&mut self, json: &str) -> Result<Vec<Action>, Error> {
        match Envelope::from_json(json) {
            Ok(envelope) => self.handle(envelope),
            Err(err) => {
                tracing::warn!(identity = %self.identity, %err, "Dropping unparseable envelope");
                Ok(Vec::new())
            }
        }
    }

    /// Handles one envelope from the relay.
    ///
    /// Messages that fail a protocol check are logged and dropped; only
    /// failures of the store, the session layer or the directory are returned.
    pub fn handle(&mut self, envelope: Envelope) -> Result<Vec<Action>, Error> {
        let result = match envelope {
            Envelope::JoinNotification { user_id } => self.on_join_notification(&user_id),
            Envelope::Private {
                from,
                to,
                kind,
                body,
            } => {
                if to != self.identity {
                    return Ok(Vec::new());
                }
                self.on_private(&from, &PairwiseMessage { kind, body })
            }
            Envelope::Group { sender, ciphertext } => self.on_group(&sender, &ciphertext),
        };

        match result {
            Err(err) if err.is_droppable() => {
                tracing::warn!(identity = %self.identity, %err, "Dropping message");
                Ok(Vec::new())
            }
            result => result,
        }
    }

    fn on_join_notification(&mut self, user_id: &str) -> Result<Vec<Action>, Error> {
        if user_id == self.identity {
            return Ok(Vec::new());
        }

        self.ensure_session(user_id)?;
        self.serve(user_id)
    }

    fn on_private(&mut self, from: &str, message: &PairwiseMessage) -> Result<Vec<Action>, Error> {
        let plaintext = self.sessions.decrypt(from, message)?;
        let payload: PrivatePayload = serde_json::from_slice(&plaintext)?;

        match payload {
            PrivatePayload::ChannelList { channels } => {
                let mut actions = Vec::new();

                let known = self.channels.len();
                self.channels.extend(channels);
                if self.channels.len() != known {
                    actions.push(Action::ChannelsUpdated(self.channels()));
                }

                if !self.served.contains(from) {
                    self.ensure_session(from)?;
                    actions.extend(self.serve(from)?);
                }

                Ok(actions)
            }
            PrivatePayload::SenderDist { dist } => {
                let distribution = SenderKeyDistributionMessage::deserialize(&dist)?;
                let name = self.sender_key_name(from);
                GroupSessionBuilder::with_config(&mut self.store, self.config.clone())
                    .process(&name, &distribution)?;
                Ok(Vec::new())
            }
        }
    }

    fn on_group(&mut self, sender: &str, ciphertext: &[u8]) -> Result<Vec<Action>, Error> {
        // The relay echoes our own broadcasts back to us
        if sender == self.identity {
            return Ok(Vec::new());
        }

        let name = self.sender_key_name(sender);
        let padded =
            GroupCipher::with_config(&mut self.store, name, self.config.clone()).decrypt(ciphertext)?;
        let message: ChannelMessage = serde_json::from_slice(&unpad(&padded)?)?;

        Ok(vec![Action::Deliver {
            sender: sender.to_string(),
            message,
        }])
    }

    fn ensure_session(&mut self, peer: &str) -> Result<(), Error> {
        if self.sessions.has_session(peer)? {
            return Ok(());
        }

        let bundle = match self.bundles.get(peer) {
            Some(bundle) => bundle.clone(),
            None => {
                let bundle = self.directory.fetch_prekey_bundle(&self.group_id, peer)?;
                self.bundles.insert(peer.to_string(), bundle.clone());
                bundle
            }
        };

        bundle.verify()?;
        self.sessions.establish(peer, &bundle)?;

        tracing::debug!(identity = %self.identity, %peer, "Established pairwise session");
        Ok(())
    }

    /// Sends `peer` our channel list and our distribution message.
    fn serve(&mut self, peer: &str) -> Result<Vec<Action>, Error> {
        let channel_list = PrivatePayload::ChannelList {
            channels: self.channels(),
        };
        let sender_dist = PrivatePayload::SenderDist {
            dist: self.distribution()?.serialized().to_vec(),
        };

        let actions = vec![
            Action::Send(self.private_envelope(peer, &channel_list)?),
            Action::Send(self.private_envelope(peer, &sender_dist)?),
        ];
        self.served.insert(peer.to_string());

        tracing::debug!(identity = %self.identity, %peer, "Sent channel list and sender key");
        Ok(actions)
    }

    fn private_envelope(&mut self, peer: &str, payload: &PrivatePayload) -> Result<Envelope, Error> {
        let plaintext = serde_json::to_vec(payload).map_err(|err| Error::Serde(err.to_string()))?;
        let message = self.sessions.encrypt(peer, &plaintext)?;

        Ok(Envelope::Private {
            from: self.identity.clone(),
            to: peer.to_string(),
            kind: message.kind,
            body: message.body,
        })
    }
}
