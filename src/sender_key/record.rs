use super::SenderKeyState;
use crate::Error;
use crate::proto::SenderKeyRecordProto;
use prost::Message;

const RECORD_VERSION: u32 = 1;

/// All sender key states held for one [`SenderKeyName`](super::SenderKeyName).
///
/// States are ordered newest first. The state used for sending is tracked
/// explicitly by key id; every other state is only kept for receiving.
#[derive(Clone, Default)]
pub struct SenderKeyRecord {
    states: Vec<SenderKeyState>,
    sending_key_id: Option<u32>,
}

impl SenderKeyRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no state was ever created or received.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// States held by this record, newest first.
    pub fn states(&self) -> &[SenderKeyState] {
        &self.states
    }

    /// Key id of the state this identity sends with, if it originated one.
    pub fn sending_key_id(&self) -> Option<u32> {
        self.sending_key_id
    }

    /// The state this identity sends with.
    pub fn sending_state(&self) -> Option<&SenderKeyState> {
        self.sending_key_id.and_then(|key_id| self.state(key_id))
    }

    pub(crate) fn sending_state_mut(&mut self) -> Option<&mut SenderKeyState> {
        let key_id = self.sending_key_id?;
        self.state_mut(key_id)
    }

    /// Looks up a state by key id.
    pub fn state(&self, key_id: u32) -> Option<&SenderKeyState> {
        self.states.iter().find(|state| state.key_id() == key_id)
    }

    pub(crate) fn state_mut(&mut self, key_id: u32) -> Option<&mut SenderKeyState> {
        self.states.iter_mut().find(|state| state.key_id() == key_id)
    }

    /// Inserts `state` as the newest, replacing any state with the same key id.
    ///
    /// Only `max_states` states are kept. A state carrying a private signing
    /// key becomes the sending state.
    pub(crate) fn add_state(&mut self, state: SenderKeyState, max_states: usize) {
        let key_id = state.key_id();
        if state.has_signing_key_private() {
            self.sending_key_id = Some(key_id);
        }

        self.states.retain(|existing| existing.key_id() != key_id);
        self.states.insert(0, state);
        self.states.truncate(max_states.max(1));

        if self
            .sending_key_id
            .is_some_and(|sending| self.state(sending).is_none())
        {
            self.sending_key_id = None;
        }
    }

    /// Encodes the record for the key store.
    pub fn serialize(&self) -> Vec<u8> {
        SenderKeyRecordProto {
            version: RECORD_VERSION,
            states: self.states.iter().map(SenderKeyState::to_proto).collect(),
            sending_key_id: self.sending_key_id,
        }
        .encode_to_vec()
    }

    /// Decodes a record written by [`serialize`](Self::serialize).
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let proto = SenderKeyRecordProto::decode(bytes)
            .map_err(|err| Error::Serde(format!("Failed to decode sender key record: {err:?}")))?;

        if proto.version != RECORD_VERSION {
            return Err(Error::Serde(format!(
                "Unsupported schema version: {}",
                proto.version
            )));
        }

        let states = proto
            .states
            .into_iter()
            .map(SenderKeyState::from_proto)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            states,
            sending_key_id: proto.sending_key_id,
        })
    }
}
