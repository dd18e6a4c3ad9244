use tube_queue_rs::TubeQueueError;

#[test]
fn test_error_types() {
    let err = TubeQueueError::TaskNotFound("test-id".to_string());
    assert_eq!(err.to_string(), "Task not found: test-id");

    let err = TubeQueueError::InvalidArgument("negative timeout".to_string());
    assert_eq!(err.to_string(), "Invalid argument: negative timeout");
}

#[test]
fn test_serialization_error_converts() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: TubeQueueError = json_err.into();
    assert!(matches!(err, TubeQueueError::SerializationError(_)));
}
