//! JSON wire format spoken over `/ws`.
//!
//! Inbound frames are `{event, requestId, payload}`. Every inbound frame is answered with
//! an [`Ack`]; state changes are pushed separately as [`Push`] frames.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tycoon_execution::Command;
use tycoon_types::{GameCode, GameConfig, GameError, GameView, LobbySummary, PlayerId};

#[derive(Debug, Deserialize)]
pub struct Inbound {
    pub event: String,
    #[serde(rename = "requestId", default)]
    pub request_id: Value,
    #[serde(default)]
    pub payload: Value,
}

/// Events that manage which session a connection belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    CreateGame {
        name: String,
        #[serde(default)]
        config: GameConfig,
    },
    JoinGame {
        code: GameCode,
        name: String,
    },
    ReconnectGame {
        code: GameCode,
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        token: String,
    },
    WatchLobby,
    WatchGame {
        code: GameCode,
    },
}

const SESSION_EVENTS: [&str; 5] = [
    "create_game",
    "join_game",
    "reconnect_game",
    "watch_lobby",
    "watch_game",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Session(SessionEvent),
    Game(Command),
}

fn is_empty(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Decodes an adjacently tagged enum. Payload-less events may arrive with `{}` or no
/// payload at all.
fn decode<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, GameError> {
    let bare = is_empty(&payload);
    match serde_json::from_value(json!({ "event": event, "payload": payload })) {
        Ok(decoded) => Ok(decoded),
        Err(_) if bare => serde_json::from_value(json!({ "event": event }))
            .map_err(|err| GameError::bad_input(format!("{event}: {err}"))),
        Err(err) => Err(GameError::bad_input(format!("{event}: {err}"))),
    }
}

pub fn parse_request(event: &str, payload: Value) -> Result<Request, GameError> {
    if SESSION_EVENTS.contains(&event) {
        decode(event, payload).map(Request::Session)
    } else {
        decode(event, payload).map(Request::Game)
    }
}

/// Acknowledgment of one inbound frame.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    #[serde(rename = "type")]
    kind: &'static str,
    request_id: Value,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(flatten)]
    data: Map<String, Value>,
}

impl Ack {
    /// `data` fields are merged into the acknowledgment; non-objects are dropped.
    pub fn ok(request_id: Value, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: "ack",
            request_id,
            ok: true,
            error: None,
            code: None,
            data,
        }
    }

    pub fn error(request_id: Value, err: &GameError) -> Self {
        Self {
            kind: "ack",
            request_id,
            ok: false,
            error: Some(err.to_string()),
            code: Some(err.code()),
            data: Map::new(),
        }
    }
}

/// Unsolicited server frames.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Push {
    State { view: GameView },
    Lobby { games: Vec<LobbySummary> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tycoon_types::TieBreak;

    #[test]
    fn test_session_events_parse() {
        assert_eq!(
            parse_request("create_game", json!({"name": "Host"})).unwrap(),
            Request::Session(SessionEvent::CreateGame {
                name: "Host".into(),
                config: GameConfig::default()
            })
        );
        let custom = parse_request(
            "create_game",
            json!({"name": "Host", "config": {"yearsTotal": 5, "maxPlayers": 3, "tieBreak": "SEAT_ORDER"}}),
        )
        .unwrap();
        let Request::Session(SessionEvent::CreateGame { config, .. }) = custom else {
            panic!("create_game expected");
        };
        assert_eq!(config.years_total, 5);
        assert_eq!(config.tie_break, TieBreak::SeatOrder);

        assert_eq!(
            parse_request("reconnect_game", json!({"code": "abcde", "playerId": 2, "token": "t"})).unwrap(),
            Request::Session(SessionEvent::ReconnectGame {
                code: GameCode("abcde".into()),
                player_id: PlayerId(2),
                token: "t".into()
            })
        );
    }

    #[test]
    fn test_payloadless_events_accept_empty_objects() {
        assert_eq!(
            parse_request("watch_lobby", json!({})).unwrap(),
            Request::Session(SessionEvent::WatchLobby)
        );
        assert_eq!(
            parse_request("gm_next", Value::Null).unwrap(),
            Request::Game(Command::GmNext)
        );
        assert_eq!(
            parse_request("audit_preview", json!({})).unwrap(),
            Request::Game(Command::AuditPreview)
        );
    }

    #[test]
    fn test_bad_requests() {
        assert_eq!(parse_request("fly", json!({})).unwrap_err().code(), "BAD_INPUT");
        assert_eq!(
            parse_request("join_game", json!({"code": "ABCDE"})).unwrap_err().code(),
            "BAD_INPUT"
        );
        assert_eq!(
            parse_request("commit_acquire", json!({"amount": "lots"})).unwrap_err().code(),
            "BAD_INPUT"
        );
    }

    #[test]
    fn test_ack_shapes() {
        let ok = serde_json::to_value(Ack::ok(json!("r1"), json!({"code": "ABCDE", "playerId": 1})))
            .unwrap();
        assert_eq!(
            ok,
            json!({"type": "ack", "requestId": "r1", "ok": true, "code": "ABCDE", "playerId": 1})
        );

        let err = serde_json::to_value(Ack::error(json!(7), &GameError::NameTaken)).unwrap();
        assert_eq!(err["ok"], false);
        assert_eq!(err["code"], "NAME_TAKEN");
        assert_eq!(err["requestId"], 7);
        assert!(err["error"].is_string());
    }

    #[test]
    fn test_inbound_defaults() {
        let inbound: Inbound = serde_json::from_str(r#"{"event":"watch_lobby"}"#).unwrap();
        assert_eq!(inbound.event, "watch_lobby");
        assert!(inbound.request_id.is_null());
        assert!(inbound.payload.is_null());
    }

    #[test]
    fn test_push_tags() {
        let push = serde_json::to_value(Push::Lobby { games: Vec::new() }).unwrap();
        assert_eq!(push, json!({"type": "lobby", "games": []}));
    }
}
