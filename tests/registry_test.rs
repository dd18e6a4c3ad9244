use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tube_queue_rs::queue::parse_timeout;
use tube_queue_rs::{Config, TaskId, TubeOptions, TubeQueueError, TubeRegistry};

#[tokio::test]
async fn test_create_tube_is_idempotent() {
    let registry = TubeRegistry::new();

    let first = registry.create_tube("simple_test", None).unwrap();
    first.put(json!(1), 0).unwrap();

    let second = registry
        .create_tube("simple_test", Some(TubeOptions::with_capacity(1)))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    // Options of a repeated create are ignored
    assert_eq!(second.options().capacity, None);
    assert_eq!(second.len(), 1);
    assert_eq!(registry.tube_names(), vec!["simple_test".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_builds_one_tube() {
    let registry = Arc::new(TubeRegistry::new());

    let mut handles = vec![];
    for _ in 0..16 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry.create_tube("shared", None).unwrap()
        }));
    }

    let mut tubes = Vec::new();
    for handle in handles {
        tubes.push(handle.await.unwrap());
    }

    for tube in &tubes {
        assert!(Arc::ptr_eq(tube, &tubes[0]));
    }
}

#[tokio::test]
async fn test_empty_tube_name_rejected() {
    let registry = TubeRegistry::new();
    assert!(matches!(
        registry.create_tube("", None),
        Err(TubeQueueError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_unknown_tube_not_found() {
    let registry = TubeRegistry::new();
    let id = TaskId::from("x");

    assert!(matches!(registry.tube("nope"), Err(TubeQueueError::TubeNotFound(_))));
    assert!(matches!(
        registry.put("nope", json!({}), 0),
        Err(TubeQueueError::TubeNotFound(_))
    ));
    assert!(matches!(
        registry.take("nope", None).await,
        Err(TubeQueueError::TubeNotFound(_))
    ));
    assert!(registry.delete("nope", &id).is_err());
    assert!(registry.release("nope", &id).is_err());
    assert!(registry.stats("nope").is_err());
}

#[tokio::test]
async fn test_operations_by_name() {
    let registry = TubeRegistry::new();
    registry.create_tube("jobs", None).unwrap();

    let low = registry.put("jobs", json!("low"), 1).unwrap();
    let high = registry.put("jobs", json!("high"), 2).unwrap();

    let task = registry.take("jobs", None).await.unwrap().unwrap();
    assert_eq!(task.id, high);
    registry.release("jobs", &high).unwrap();

    let task = registry.take("jobs", None).await.unwrap().unwrap();
    assert_eq!(task.id, high);
    registry.delete("jobs", &high).unwrap();
    assert!(registry.delete("jobs", &high).is_err());

    let task = registry.take("jobs", Some(Duration::ZERO)).await.unwrap().unwrap();
    assert_eq!(task.id, low);
    assert!(registry
        .take("jobs", Some(Duration::ZERO))
        .await
        .unwrap()
        .is_none());

    let stats = registry.stats("jobs").unwrap();
    assert_eq!(stats.put, 2);
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.leased, 1);
}

#[tokio::test]
async fn test_tubes_are_isolated() {
    let registry = TubeRegistry::new();
    registry.create_tube("a", None).unwrap();
    registry.create_tube("b", None).unwrap();

    let id = registry.put("a", json!({}), 0).unwrap();

    assert!(registry.take("b", Some(Duration::ZERO)).await.unwrap().is_none());
    assert!(matches!(
        registry.delete("b", &id),
        Err(TubeQueueError::TaskNotFound(_))
    ));
    assert_eq!(registry.take("a", None).await.unwrap().unwrap().id, id);
}

#[tokio::test]
async fn test_drop_tube_wakes_waiters() {
    let registry = Arc::new(TubeRegistry::new());
    registry.create_tube("temp", None).unwrap();

    let taker = tokio::spawn({
        let registry = Arc::clone(&registry);
        async move { registry.take("temp", None).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    registry.drop_tube("temp").unwrap();

    let result = taker.await.unwrap();
    assert!(matches!(result, Err(TubeQueueError::TubeNotFound(_))));
    assert!(registry.tube_names().is_empty());
    assert!(registry.drop_tube("temp").is_err());

    // Re-creating gives a fresh, empty tube
    let fresh = registry.create_tube("temp", None).unwrap();
    assert!(fresh.is_empty());
    assert!(!fresh.is_closed());
}

#[tokio::test]
async fn test_independent_registries() {
    let one = TubeRegistry::new();
    let two = TubeRegistry::new();
    one.create_tube("jobs", None).unwrap();
    two.create_tube("jobs", None).unwrap();

    one.put("jobs", json!({}), 0).unwrap();
    assert_eq!(one.tube("jobs").unwrap().len(), 1);
    assert!(two.tube("jobs").unwrap().is_empty());
}

#[tokio::test]
async fn test_registry_from_config_sets_capacity() {
    let mut config = Config::default();
    config.max_tasks_per_tube = 2;
    let registry = TubeRegistry::from_config(&config);
    registry.create_tube("small", None).unwrap();

    registry.put("small", json!(1), 0).unwrap();
    registry.put("small", json!(2), 0).unwrap();
    assert!(matches!(
        registry.put("small", json!(3), 0),
        Err(TubeQueueError::TubeFull { .. })
    ));
}

#[tokio::test]
async fn test_tube_names_sorted() {
    let registry = TubeRegistry::new();
    for name in ["priority_test", "simple_test", "alpha"] {
        registry.create_tube(name, None).unwrap();
    }
    let names: Vec<_> = registry.tube_names();
    assert_eq!(names, vec!["alpha", "priority_test", "simple_test"]);

    let unique: HashSet<_> = names.into_iter().collect();
    assert_eq!(unique.len(), 3);
}

#[test]
fn test_parse_timeout_from_seconds() {
    assert_eq!(parse_timeout(Some(2.0)).unwrap(), Some(Duration::from_secs(2)));
    assert!(matches!(
        parse_timeout(Some(-0.5)),
        Err(TubeQueueError::InvalidArgument(_))
    ));
    assert!(matches!(
        parse_timeout(Some(1e20)),
        Err(TubeQueueError::InvalidArgument(_))
    ));
}
