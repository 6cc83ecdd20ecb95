//! Wire messages exchanged with the management host.
//!
//! Every frame is a JSON object. Inbound frames are classified into
//! [`InboundMessage`]; outbound requests are built as [`OutboundMessage`] and
//! encoded with [`OutboundMessage::encode`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Credential, Error, Result, SessionToken};

/// Protocol version declared in the connect frame.
pub const PROTOCOL_VERSION: &str = "1";

/// Method used to authenticate with an API key.
pub const LOGIN_METHOD: &str = "auth.login_with_api_key";

/// Method used to query the current host state.
pub const STATE_METHOD: &str = "system.state";

/// The single topic this client subscribes to.
pub const SUBSCRIPTION_TOPIC: &str = "system";

/// How a frame carrying a `result` field is read.
///
/// The wire shape of a login result and a query result is identical, so the
/// caller says which request is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultContext {
    /// Login request outstanding: the frame is the auth result, whatever it
    /// contains
    Login,
    /// Otherwise: `result` frames are query results
    Query,
}

/// Kind of a `msg`-tagged event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Subscription confirmation
    Ready,
    /// Change notification
    Changed,
    /// Any other `msg` tag
    Other(String),
}

impl EventKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "ready" => Self::Ready,
            "changed" => Self::Changed,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `{msg:"connected", session:<token>}`
    Connected {
        /// Server-issued session token
        session: SessionToken,
    },
    /// Reply to the login request
    AuthResult {
        /// Whether the `result` field was truthy
        success: bool,
    },
    /// `{result:<state>}` reply to the state query
    QueryResult {
        /// Raw result payload
        state: Value,
    },
    /// `{msg:<kind>, id:<status>}`
    Event {
        /// Event kind
        kind: EventKind,
        /// Event id, absent when missing, null or empty
        id: Option<String>,
    },
}

impl InboundMessage {
    /// Classify a raw text frame.
    ///
    /// # Errors
    /// - [`Error::UnrecognizedFrame`] if the frame is not a JSON object, or
    ///   outside a login matches none of the known shapes
    /// - [`Error::Protocol`] for a `connected` frame without a usable token
    pub fn classify(frame: &str, context: ResultContext) -> Result<Self> {
        let value: Value = serde_json::from_str(frame)
            .map_err(|e| Error::UnrecognizedFrame(format!("not JSON: {e}")))?;
        match value {
            Value::Object(object) => Self::from_object(object, context),
            other => Err(Error::UnrecognizedFrame(format!(
                "expected object, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn from_object(mut object: Map<String, Value>, context: ResultContext) -> Result<Self> {
        if context == ResultContext::Login {
            return Ok(Self::AuthResult {
                success: is_truthy(object.get("result")),
            });
        }

        if let Some(state) = object.remove("result") {
            return Ok(Self::QueryResult { state });
        }

        let Some(msg) = object.get("msg") else {
            return Err(Error::UnrecognizedFrame(
                "neither 'result' nor 'msg' present".to_string(),
            ));
        };
        let Some(tag) = msg.as_str() else {
            return Err(Error::UnrecognizedFrame(format!(
                "'msg' is {}, expected string",
                json_kind(msg)
            )));
        };

        if tag == "connected" {
            let session = object
                .get("session")
                .and_then(Value::as_str)
                .and_then(|s| SessionToken::new(s))
                .ok_or_else(|| {
                    Error::Protocol("connected frame without session token".to_string())
                })?;
            return Ok(Self::Connected { session });
        }

        Ok(Self::Event {
            kind: EventKind::from_tag(tag),
            id: object.get("id").and_then(event_id),
        })
    }
}

/// JavaScript-style truthiness of an optional JSON value.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn event_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A request sent to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// `{msg:"connect", version:"1", support:["1"]}`
    Connect,
    /// Login with an API key under the bound session token
    Login {
        /// Bound session token
        token: SessionToken,
        /// API key
        credential: Credential,
    },
    /// Query the current host state
    QueryState {
        /// Bound session token
        token: SessionToken,
    },
    /// Subscribe to [`SUBSCRIPTION_TOPIC`]
    Subscribe {
        /// Bound session token
        token: SessionToken,
    },
}

#[derive(Serialize)]
#[serde(tag = "msg", rename_all = "lowercase")]
enum Wire<'a> {
    Connect {
        version: &'a str,
        support: [&'a str; 1],
    },
    Method {
        id: &'a str,
        method: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        params: Option<[&'a str; 1]>,
    },
    Sub {
        id: &'a str,
        name: &'a str,
    },
}

impl OutboundMessage {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        let wire = match self {
            Self::Connect => Wire::Connect {
                version: PROTOCOL_VERSION,
                support: [PROTOCOL_VERSION],
            },
            Self::Login { token, credential } => Wire::Method {
                id: token.as_str(),
                method: LOGIN_METHOD,
                params: Some([credential.expose()]),
            },
            Self::QueryState { token } => Wire::Method {
                id: token.as_str(),
                method: STATE_METHOD,
                params: None,
            },
            Self::Subscribe { token } => Wire::Sub {
                id: token.as_str(),
                name: SUBSCRIPTION_TOPIC,
            },
        };
        Ok(serde_json::to_string(&wire)?)
    }

    /// Short name for log lines. Never includes the frame body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Login { .. } => LOGIN_METHOD,
            Self::QueryState { .. } => STATE_METHOD,
            Self::Subscribe { .. } => "sub",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(s: &str) -> SessionToken {
        SessionToken::new(s).unwrap()
    }

    fn encoded(message: &OutboundMessage) -> Value {
        serde_json::from_str(&message.encode().unwrap()).unwrap()
    }

    #[test]
    fn test_connect_frame() {
        assert_eq!(
            encoded(&OutboundMessage::Connect),
            json!({"msg": "connect", "version": "1", "support": ["1"]})
        );
    }

    #[test]
    fn test_login_frame() {
        let message = OutboundMessage::Login {
            token: token("s1"),
            credential: Credential::new("1-key"),
        };
        assert_eq!(
            encoded(&message),
            json!({
                "id": "s1",
                "msg": "method",
                "method": "auth.login_with_api_key",
                "params": ["1-key"]
            })
        );
    }

    #[test]
    fn test_login_debug_hides_key() {
        let message = OutboundMessage::Login {
            token: token("s1"),
            credential: Credential::new("1-key"),
        };
        assert!(!format!("{message:?}").contains("1-key"));
        assert_eq!(message.kind(), "auth.login_with_api_key");
    }

    #[test]
    fn test_query_frame_has_no_params() {
        let message = OutboundMessage::QueryState { token: token("s1") };
        assert_eq!(
            encoded(&message),
            json!({"id": "s1", "msg": "method", "method": "system.state"})
        );
    }

    #[test]
    fn test_subscribe_frame() {
        let message = OutboundMessage::Subscribe { token: token("s1") };
        assert_eq!(
            encoded(&message),
            json!({"id": "s1", "name": "system", "msg": "sub"})
        );
    }

    #[test]
    fn test_classify_connected() {
        let message =
            InboundMessage::classify(r#"{"msg":"connected","session":"abc"}"#, ResultContext::Query)
                .unwrap();
        assert_eq!(
            message,
            InboundMessage::Connected {
                session: token("abc")
            }
        );
    }

    #[test]
    fn test_classify_connected_without_session() {
        let result = InboundMessage::classify(r#"{"msg":"connected"}"#, ResultContext::Query);
        assert!(matches!(result, Err(Error::Protocol(_))));

        let result =
            InboundMessage::classify(r#"{"msg":"connected","session":""}"#, ResultContext::Query);
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn test_classify_login_results() {
        let cases = [
            (r#"{"result":true}"#, true),
            (r#"{"result":false}"#, false),
            (r#"{"result":null}"#, false),
            (r#"{"result":0}"#, false),
            (r#"{"result":1}"#, true),
            (r#"{"result":""}"#, false),
            (r#"{"result":"yes"}"#, true),
            (r#"{"result":{}}"#, true),
            (r#"{"msg":"ready"}"#, false),
        ];
        for (frame, success) in cases {
            assert_eq!(
                InboundMessage::classify(frame, ResultContext::Login).unwrap(),
                InboundMessage::AuthResult { success },
                "frame: {frame}"
            );
        }
    }

    #[test]
    fn test_classify_query_result() {
        let message =
            InboundMessage::classify(r#"{"result":"READY"}"#, ResultContext::Query).unwrap();
        assert_eq!(
            message,
            InboundMessage::QueryResult {
                state: json!("READY")
            }
        );
    }

    #[test]
    fn test_result_wins_over_msg() {
        let message =
            InboundMessage::classify(r#"{"msg":"result","result":"BOOTING"}"#, ResultContext::Query)
                .unwrap();
        assert!(matches!(message, InboundMessage::QueryResult { .. }));
    }

    #[test]
    fn test_classify_events() {
        let message =
            InboundMessage::classify(r#"{"msg":"changed","id":"BOOTING"}"#, ResultContext::Query)
                .unwrap();
        assert_eq!(
            message,
            InboundMessage::Event {
                kind: EventKind::Changed,
                id: Some("BOOTING".to_string())
            }
        );

        let message = InboundMessage::classify(r#"{"msg":"ready"}"#, ResultContext::Query).unwrap();
        assert_eq!(
            message,
            InboundMessage::Event {
                kind: EventKind::Ready,
                id: None
            }
        );

        let message =
            InboundMessage::classify(r#"{"msg":"added","id":7}"#, ResultContext::Query).unwrap();
        assert_eq!(
            message,
            InboundMessage::Event {
                kind: EventKind::Other("added".to_string()),
                id: Some("7".to_string())
            }
        );
    }

    #[test]
    fn test_event_with_null_or_empty_id() {
        for frame in [
            r#"{"msg":"changed","id":null}"#,
            r#"{"msg":"changed","id":""}"#,
            r#"{"msg":"changed"}"#,
        ] {
            let message = InboundMessage::classify(frame, ResultContext::Query).unwrap();
            assert_eq!(
                message,
                InboundMessage::Event {
                    kind: EventKind::Changed,
                    id: None
                }
            );
        }
    }

    #[test]
    fn test_unrecognized_frames() {
        for frame in ["not json", "[1,2]", "42", r#"{"foo":1}"#, r#"{"msg":5}"#] {
            let result = InboundMessage::classify(frame, ResultContext::Query);
            assert!(
                matches!(result, Err(Error::UnrecognizedFrame(_))),
                "frame: {frame}"
            );
        }
    }

    #[test]
    fn test_malformed_frame_during_login_is_unrecognized() {
        let result = InboundMessage::classify("garbage", ResultContext::Login);
        assert!(matches!(result, Err(Error::UnrecognizedFrame(_))));
    }
}
