//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::{Intent, PlayerId, Team};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request to spawn a player for this connection
    Join(JoinRequest),

    /// Gameplay action for the connection's player
    Action(ActionRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Client-chosen player id
    pub id: PlayerId,
    pub team: Team,
    /// Display name, unique among connected players
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub player_id: PlayerId,
    pub action: Intent,
}

/// Targeted messages sent from server to client.
///
/// Full state snapshots are sent as the bare game state object; clients treat
/// any frame that is not an `error` as state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Request refused (name collision, invalid join, blocked move)
    Error { message: String },
}

impl ClientMsg {
    /// Decode one inbound text frame
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_decodes_with_team() {
        let msg = ClientMsg::decode(
            r#"{"type":"join","data":{"id":"abc","team":"blue","name":"Bea"}}"#,
        )
        .unwrap();
        match msg {
            ClientMsg::Join(join) => {
                assert_eq!(join.id, "abc");
                assert_eq!(join.team, Team::Blue);
                assert_eq!(join.name, "Bea");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn action_decodes_nested_intent() {
        let msg = ClientMsg::decode(
            r#"{"type":"action","data":{"playerId":"abc","action":{"type":"chat","message":"go"}}}"#,
        )
        .unwrap();
        match msg {
            ClientMsg::Action(action) => {
                assert_eq!(action.player_id, "abc");
                assert_eq!(
                    action.action,
                    Intent::Chat {
                        message: "go".into()
                    }
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn malformed_payloads_are_rejected_at_decode() {
        for raw in [
            "not json",
            r#"{"type":"join","data":{"id":"abc","team":"green","name":"x"}}"#,
            r#"{"type":"join","data":{"id":"abc","team":"red"}}"#,
            r#"{"type":"action","data":{"playerId":"abc","action":{"type":"move","x":1}}}"#,
            r#"{"type":"dance","data":{}}"#,
        ] {
            assert!(ClientMsg::decode(raw).is_err(), "accepted: {raw}");
        }
    }

    #[test]
    fn error_is_the_only_targeted_kind() {
        let json = serde_json::to_value(ServerMsg::Error {
            message: "Player name 'Ann' is already taken".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(
            json["data"]["message"],
            "Player name 'Ann' is already taken"
        );
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
