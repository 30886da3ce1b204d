use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("annotations#update", Data::new());
    assert_eq!(frame.method, "annotations#update");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.view_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let req = Frame::request("camera#getZoomLevel", Data::new()).with_view_id(7);
    let done = req.done_with(12.5);

    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.view_id, Some(7));
    assert_eq!(done.method, "camera#getZoomLevel");
    assert_eq!(done.status, Status::Done);
    assert_eq!(done.result().and_then(serde_json::Value::as_f64), Some(12.5));
}

#[test]
fn done_carries_null_result() {
    let req = Frame::request("polylines#update", Data::new());
    let done = req.done();
    assert_eq!(done.result(), Some(&serde_json::Value::Null));
    assert!(done.bytes.is_none());
}

#[test]
fn done_bytes_carries_payload() {
    let req = Frame::request("map#takeSnapshot", Data::new());
    let done = req.done_bytes(vec![0x89, b'P', b'N', b'G']);
    assert_eq!(done.status, Status::Done);
    assert_eq!(done.bytes.as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
}

#[test]
fn bytes_travel_as_base64() {
    let req = Frame::request("map#takeSnapshot", Data::new());
    let done = req.done_bytes(vec![0x89, b'P', b'N', b'G']);

    let wire = serde_json::to_value(&done).expect("serialize");
    assert_eq!(wire["bytes"], serde_json::json!("iVBORw=="));

    let back: Frame = serde_json::from_value(wire).expect("deserialize");
    assert_eq!(back.bytes, done.bytes);

    let plain = serde_json::to_value(req.done()).expect("serialize");
    assert!(plain.get("bytes").is_none());

    let mut bad = plain;
    bad["bytes"] = serde_json::json!("not base64!");
    assert!(serde_json::from_value::<Frame>(bad).is_err());
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(Status::Cancel.is_terminal());
    assert!(Status::NotImplemented.is_terminal());
    assert!(!Status::Request.is_terminal());
    assert!(!Status::Event.is_terminal());
}

#[test]
fn prefix_and_op_extraction() {
    let frame = Frame::request("annotations#showInfoWindow", Data::new());
    assert_eq!(frame.prefix(), "annotations");
    assert_eq!(frame.op(), "showInfoWindow");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
    assert_eq!(frame.op(), "");
}

#[test]
fn json_without_data_decodes_as_empty_bag() {
    let id = Uuid::new_v4();
    let text = format!(r#"{{"id":"{id}","method":"map#isCompassEnabled","status":"request"}}"#);
    let frame: Frame = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(frame.id, id);
    assert!(frame.data.is_empty());
    assert!(frame.parent_id.is_none());
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("missing field")]
    struct Missing;

    impl ErrorCode for Missing {
        fn error_code(&self) -> &'static str {
            "E_DECODE_MISSING"
        }
    }

    let req = Frame::request("annotations#isInfoWindowShown", Data::new());
    let err = req.error_from(&Missing);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get("code").and_then(|v| v.as_str()), Some("E_DECODE_MISSING"));
    assert_eq!(err.data.get("message").and_then(|v| v.as_str()), Some("missing field"));
    assert_eq!(err.data.get("retryable").and_then(serde_json::Value::as_bool), Some(false));
}

#[test]
fn not_implemented_and_cancel_reference_request() {
    let req = Frame::request("map#doesNotExist", Data::new());
    let sentinel = req.not_implemented();
    assert_eq!(sentinel.parent_id, Some(req.id));
    assert_eq!(sentinel.status, Status::NotImplemented);

    let cancel = req.cancelled();
    assert_eq!(cancel.parent_id, Some(req.id));
    assert_eq!(cancel.status, Status::Cancel);
}

#[test]
fn event_has_no_parent() {
    let ev = Frame::event("camera#onIdle", Data::new()).with_view_id(3);
    assert_eq!(ev.status, Status::Event);
    assert!(ev.parent_id.is_none());
    assert_eq!(ev.view_id, Some(3));
}
