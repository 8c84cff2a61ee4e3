//! Protocol layer tests: control request/response shapes, names, params.

#[cfg(test)]
mod tests {
    use nls_protocol::*;
    use serde_json::json;

    // ─────────────────────────────────────────────────────────────────────
    // Identifiers
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn generated_id_is_32_hex_digits() {
        let id = generate_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(generate_id(), generate_id());
    }

    // ─────────────────────────────────────────────────────────────────────
    // ControlRequest
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn start_request_wire_shape() {
        let payload = serde_json::to_value(StartParams::default()).unwrap();
        let req = ControlRequest::new(RequestName::Start, "task-1", "app-key", payload);
        let parsed: serde_json::Value = serde_json::from_str(&req.to_json().unwrap()).unwrap();

        assert_eq!(parsed["header"]["namespace"], "SpeechTranscriber");
        assert_eq!(parsed["header"]["name"], "StartTranscription");
        assert_eq!(parsed["header"]["task_id"], "task-1");
        assert_eq!(parsed["header"]["appkey"], "app-key");
        assert_eq!(parsed["header"]["message_id"].as_str().unwrap().len(), 32);
        assert_eq!(parsed["payload"]["format"], "pcm");
        assert_eq!(parsed["payload"]["sample_rate"], 16000);
        assert_eq!(parsed["context"]["sdk"]["language"], "rust");
    }

    #[test]
    fn each_request_gets_a_fresh_message_id() {
        let a = ControlRequest::new(RequestName::Control, "task-1", "k", json!({}));
        let b = ControlRequest::new(RequestName::Control, "task-1", "k", json!({}));
        assert_ne!(a.header.message_id, b.header.message_id);
        assert_eq!(a.header.task_id, b.header.task_id);
    }

    #[test]
    fn request_names() {
        assert_eq!(RequestName::Start.as_str(), Names::START_TRANSCRIPTION);
        assert_eq!(RequestName::Control.as_str(), Names::CONTROL_TRANSCRIPTION);
        assert_eq!(RequestName::Stop.as_str(), Names::STOP_TRANSCRIPTION);
    }

    // ─────────────────────────────────────────────────────────────────────
    // ControlResponse
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn response_parsed_from_wire_format() {
        // What the gateway sends right after StartTranscription
        let wire = r#"{"header":{"namespace":"SpeechTranscriber","name":"TranscriptionStarted","status":20000000,"message_id":"m1","task_id":"t1","status_text":"Gateway:SUCCESS:Success."},"payload":{"session_id":"s1"}}"#;
        let resp = ControlResponse::parse(wire).unwrap();
        assert_eq!(resp.response_name(), Some(ResponseName::TranscriptionStarted));
        assert!(resp.is_success());
        assert_eq!(resp.header.task_id, "t1");
        assert_eq!(resp.payload["session_id"], "s1");
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let resp = ControlResponse::parse(r#"{"header":{"name":"SentenceBegin"}}"#).unwrap();
        assert_eq!(resp.response_name(), Some(ResponseName::SentenceBegin));
        assert_eq!(resp.header.status, 0);
        assert!(resp.payload.is_null());
        assert!(!resp.is_success());
    }

    #[test]
    fn unknown_response_name() {
        let resp = ControlResponse::parse(r#"{"header":{"name":"SomethingNew"}}"#).unwrap();
        assert_eq!(resp.response_name(), None);
    }

    #[test]
    fn malformed_response_is_an_error() {
        assert!(matches!(ControlResponse::parse("not json"), Err(ProtocolError::Json(_))));
        assert!(ControlResponse::parse(r#"{"payload":{}}"#).is_err());
    }

    #[test]
    fn task_failed_display() {
        let resp = ControlResponse::parse(
            r#"{"header":{"name":"TaskFailed","status":40000004,"status_text":"IDLE_TIMEOUT"}}"#,
        )
        .unwrap();
        assert_eq!(resp.to_string(), "TaskFailed [40000004]: IDLE_TIMEOUT");
        assert!(ResponseName::TaskFailed.is_terminal());
        assert!(!ResponseName::SentenceEnd.is_terminal());
    }

    #[test]
    fn response_name_parse_matches_as_str() {
        for name in [
            ResponseName::TranscriptionStarted,
            ResponseName::SentenceBegin,
            ResponseName::TranscriptionResultChanged,
            ResponseName::SentenceEnd,
            ResponseName::TranscriptionCompleted,
            ResponseName::TaskFailed,
        ] {
            assert_eq!(ResponseName::parse(name.as_str()), Some(name));
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Params and payloads
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn start_params_defaults() {
        let params = StartParams::default();
        assert_eq!(params.format, "pcm");
        assert_eq!(params.sample_rate, 16_000);
        assert!(params.enable_intermediate_result);
        assert!(params.enable_punctuation_prediction);
        assert!(params.enable_inverse_text_normalization);
    }

    #[test]
    fn start_params_extra_options_are_flattened() {
        let params = StartParams::default()
            .with_sample_rate(8_000)
            .with_option("max_sentence_silence", json!(800));
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["sample_rate"], 8000);
        assert_eq!(json["max_sentence_silence"], 800);
        assert!(json.get("extra").is_none());
    }

    #[test]
    fn sentence_end_payload() {
        let resp = ControlResponse::parse(
            r#"{"header":{"name":"SentenceEnd"},"payload":{"index":2,"time":5400,"result":"hello world","confidence":0.93,"begin_time":3100,"stash_result":{"sentenceId":3,"beginTime":5400,"text":"","currentTime":5400}}}"#,
        )
        .unwrap();
        let payload: SentenceEndPayload = resp.payload_as().unwrap();
        assert_eq!(payload.index, 2);
        assert_eq!(payload.result, "hello world");
        assert_eq!(payload.begin_time, 3100);
        let stash = payload.stash_result.unwrap();
        assert_eq!(stash.sentence_id, 3);
        assert_eq!(stash.current_time, 5400);
    }

    #[test]
    fn result_changed_payload() {
        let resp = ControlResponse::parse(
            r#"{"header":{"name":"TranscriptionResultChanged"},"payload":{"index":1,"time":1200,"result":"hel"}}"#,
        )
        .unwrap();
        let payload: ResultChangedPayload = resp.payload_as().unwrap();
        assert_eq!(payload.result, "hel");
        assert_eq!(payload.time, 1200);
        assert!(payload.words.is_empty());
    }
}
