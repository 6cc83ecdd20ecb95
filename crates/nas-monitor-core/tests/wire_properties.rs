//! Property tests for frame classification and endpoint derivation.

use nas_monitor_core::{
    Credential, Endpoint, Error, InboundMessage, OutboundMessage, ResultContext, SessionToken,
    Status,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn context() -> impl Strategy<Value = ResultContext> {
    prop_oneof![Just(ResultContext::Login), Just(ResultContext::Query)]
}

proptest! {
    #[test]
    fn test_classify_never_panics(frame in any::<String>(), context in context()) {
        let _ = InboundMessage::classify(&frame, context);
    }

    #[test]
    fn test_non_object_frames_are_unrecognized(value in prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
        Just(Value::Null),
        prop::collection::vec(any::<u8>(), 0..4).prop_map(|v| json!(v)),
    ]) {
        let result = InboundMessage::classify(&value.to_string(), ResultContext::Query);
        prop_assert!(matches!(result, Err(Error::UnrecognizedFrame(_))));
    }

    #[test]
    fn test_connected_token_is_bound_verbatim(token in "[A-Za-z0-9-]{1,40}") {
        let frame = json!({"msg": "connected", "session": &token}).to_string();
        let message = InboundMessage::classify(&frame, ResultContext::Query).unwrap();
        prop_assert_eq!(
            message,
            InboundMessage::Connected { session: SessionToken::new(token.clone()).unwrap() }
        );
    }

    #[test]
    fn test_query_result_strings_map_to_status(state in "[A-Z_]{1,16}") {
        let frame = json!({"result": &state}).to_string();
        let message = InboundMessage::classify(&frame, ResultContext::Query).unwrap();
        let InboundMessage::QueryResult { state: value } = message else {
            return Err(TestCaseError::fail("expected a query result"));
        };
        let status = Status::from_query_result(&value);
        prop_assert_eq!(status.as_tag(), state.as_str());
    }

    #[test]
    fn test_login_frame_carries_credential(token in "[a-z0-9]{1,12}", key in "[ -~]{0,32}") {
        let message = OutboundMessage::Login {
            token: SessionToken::new(token.clone()).unwrap(),
            credential: Credential::new(key.clone()),
        };
        let value: Value = serde_json::from_str(&message.encode().unwrap()).unwrap();
        prop_assert_eq!(&value["id"], &json!(token));
        prop_assert_eq!(&value["params"], &json!([key]));
    }

    #[test]
    fn test_http_base_urls_become_socket_urls(host in "[a-z]{1,10}(\\.[a-z]{2,5}){0,2}", tls in any::<bool>()) {
        let scheme = if tls { "https" } else { "http" };
        let endpoint = Endpoint::parse(&format!("{scheme}://{host}/")).unwrap();
        let expected_scheme = if tls { "wss" } else { "ws" };
        prop_assert_eq!(endpoint.as_str(), format!("{expected_scheme}://{host}/websocket"));
        prop_assert_eq!(endpoint.host(), host.as_str());
        prop_assert_eq!(endpoint.is_secure(), tls);
    }
}
