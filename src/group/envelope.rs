//! JSON shapes exchanged with the relay and the membership service.

use super::PairwiseMessageKind;
use crate::{Error, PreKeyBundle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest envelope the relay forwards; bigger ones are silently dropped by it.
pub const MAX_ENVELOPE_SIZE: usize = 4096;

/// A message on the group's duplex channel.
///
/// `group` and `join_notification` are broadcast to every connected member,
/// the sender included. `private` is delivered only to `to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// A sender key ciphertext for the whole group.
    Group {
        /// Identity of the sender.
        sender: String,
        /// Signed sender key message.
        #[serde(with = "crate::serde_base64")]
        ciphertext: Vec<u8>,
    },
    /// A pairwise ciphertext carrying a [`PrivatePayload`].
    Private {
        /// Identity of the sender.
        from: String,
        /// Identity of the recipient.
        to: String,
        /// Pairwise message kind.
        kind: PairwiseMessageKind,
        /// Pairwise ciphertext.
        #[serde(with = "crate::serde_base64")]
        body: Vec<u8>,
    },
    /// Announces that `user_id` joined the group.
    JoinNotification {
        /// Identity of the new member.
        user_id: String,
    },
}

impl Envelope {
    /// Parses an envelope received from the relay.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encodes the envelope for the relay.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|err| Error::Serde(err.to_string()))
    }
}

/// Plaintext of a private envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrivatePayload {
    /// The sender's known channels.
    ChannelList {
        /// Channel names.
        channels: Vec<String>,
    },
    /// The sender's serialized sender key distribution message.
    SenderDist {
        /// Serialized distribution message.
        #[serde(with = "crate::serde_base64")]
        dist: Vec<u8>,
    },
}

/// Plaintext of a group message, before padding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Channel the text was posted to.
    pub channel: String,
    /// Message text.
    pub text: String,
}

/// Response of the membership service when a group is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServerResponse {
    /// Group id.
    pub server_id: String,
    /// Token that lets members join.
    pub join_token: String,
}

/// Body of a join request to the membership service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Token handed out at creation.
    pub join_token: String,
    /// Identity of the joining member.
    pub user_id: String,
    /// Bundle published for the other members.
    pub prekey_bundle: PreKeyBundle,
}

/// Response of the membership service to a join request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Token authenticating the relay connection.
    pub member_token: String,
    /// Bundles of every other member, by identity.
    pub others: BTreeMap<String, PreKeyBundle>,
    /// First member to join, if any.
    pub admin_user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_envelope_shape() {
        let envelope = Envelope::Group {
            sender: "alice".to_string(),
            ciphertext: vec![1, 2, 3],
        };
        let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"type": "group", "sender": "alice", "ciphertext": "AQID"})
        );
    }

    #[test]
    fn test_private_envelope_shape() {
        let json = r#"{"type":"private","from":"bob","to":"alice","kind":"initial","body":"aGk="}"#;
        let envelope = Envelope::from_json(json).unwrap();

        assert_eq!(
            envelope,
            Envelope::Private {
                from: "bob".to_string(),
                to: "alice".to_string(),
                kind: PairwiseMessageKind::Initial,
                body: b"hi".to_vec(),
            }
        );
    }

    #[test]
    fn test_join_notification_shape() {
        let envelope = Envelope::from_json(r#"{"type":"join_notification","user_id":"carol"}"#).unwrap();
        assert_eq!(
            envelope,
            Envelope::JoinNotification {
                user_id: "carol".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_or_incomplete_envelopes_are_malformed() {
        for json in [
            r#"{"type":"presence","user_id":"carol"}"#,
            r#"{"type":"group","sender":"alice"}"#,
            r#"{"type":"group","sender":"alice","ciphertext":"***"}"#,
            "not json",
        ] {
            assert!(
                matches!(Envelope::from_json(json), Err(Error::Malformed(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn test_private_payload_shapes() {
        let list = PrivatePayload::ChannelList {
            channels: vec!["general".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            serde_json::json!({"type": "channel_list", "channels": ["general"]})
        );

        let dist = PrivatePayload::SenderDist { dist: vec![0xFF] };
        assert_eq!(
            serde_json::to_value(&dist).unwrap(),
            serde_json::json!({"type": "sender_dist", "dist": "/w=="})
        );
    }

    #[test]
    fn test_join_response_without_admin() {
        let json = r#"{"member_token":"t","others":{},"admin_user_id":null}"#;
        let response: JoinResponse = serde_json::from_str(json).unwrap();

        assert!(response.others.is_empty());
        assert_eq!(response.admin_user_id, None);
    }

    #[test]
    fn test_create_server_response_fields() {
        let json = r#"{"server_id":"0b6f","join_token":"4c1d"}"#;
        let response: CreateServerResponse = serde_json::from_str(json).unwrap();

        assert_eq!(
            response,
            CreateServerResponse {
                server_id: "0b6f".to_string(),
                join_token: "4c1d".to_string(),
            }
        );
        assert_eq!(serde_json::to_string(&response).unwrap(), json);
    }
}
