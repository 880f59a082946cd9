use std::fmt;

/// Device index used for every member; one device per identity.
pub const DEFAULT_DEVICE_INDEX: u32 = 1;

/// Identifies one sending ratchet: a sender's device within a group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SenderKeyName {
    group_id: String,
    sender: String,
    device_index: u32,
}

impl SenderKeyName {
    /// Creates a name for `sender`'s device `device_index` in `group_id`.
    pub fn new(group_id: impl Into<String>, sender: impl Into<String>, device_index: u32) -> Self {
        Self {
            group_id: group_id.into(),
            sender: sender.into(),
            device_index,
        }
    }

    /// The group this ratchet belongs to.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// The identity that owns this ratchet.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// The sending device.
    pub fn device_index(&self) -> u32 {
        self.device_index
    }
}

impl fmt::Display for SenderKeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.group_id, self.sender, self.device_index)
    }
}
