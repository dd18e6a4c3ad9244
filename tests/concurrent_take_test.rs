use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tube_queue_rs::queue::tube::{Tube, TubeOptions};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_take_no_duplicates() {
    let tube = Arc::new(Tube::new("concurrent", TubeOptions::default()));

    let mut uploaded = HashSet::new();
    for i in 0..200 {
        uploaded.insert(tube.put(json!({"id": i}), i % 7).unwrap());
    }

    // Spawn 10 consumers that race for tasks
    let mut handles = vec![];
    for _ in 0..10 {
        let tube = Arc::clone(&tube);
        handles.push(tokio::spawn(async move {
            let mut local = Vec::new();
            while let Some(task) = tube.take(Some(Duration::ZERO)).await.unwrap() {
                local.push(task.id);
            }
            local
        }));
    }

    let mut taken = Vec::new();
    for handle in handles {
        taken.extend(handle.await.unwrap());
    }

    let unique: HashSet<_> = taken.iter().cloned().collect();
    assert_eq!(
        taken.len(),
        unique.len(),
        "Race condition detected: {} duplicate tasks",
        taken.len() - unique.len()
    );
    assert_eq!(unique, uploaded);
    assert_eq!(tube.stats().ready, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_put_granted_to_one_waiter() {
    let tube = Arc::new(Tube::new("single", TubeOptions::default()));

    let mut handles = vec![];
    for _ in 0..8 {
        let tube = Arc::clone(&tube);
        handles.push(tokio::spawn(async move {
            tube.take(Some(Duration::from_millis(500))).await.unwrap()
        }));
    }

    sleep(Duration::from_millis(100)).await;
    let id = tube.put(json!("only"), 0).unwrap();

    let mut winners = Vec::new();
    for handle in handles {
        if let Some(task) = handle.await.unwrap() {
            winners.push(task.id);
        }
    }

    assert_eq!(winners, vec![id]);
    assert_eq!(tube.stats().waiting, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_and_consumers() {
    let tube = Arc::new(Tube::new("mixed", TubeOptions::default()));
    let per_producer = 100;
    let producers = 4;

    let mut consumer_handles = vec![];
    for _ in 0..4 {
        let tube = Arc::clone(&tube);
        consumer_handles.push(tokio::spawn(async move {
            let mut local = Vec::new();
            while let Some(task) = tube.take(Some(Duration::from_millis(300))).await.unwrap() {
                tube.delete(&task.id).unwrap();
                local.push(task.id);
            }
            local
        }));
    }

    let mut producer_handles = vec![];
    for p in 0..producers {
        let tube = Arc::clone(&tube);
        producer_handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..per_producer {
                ids.push(tube.put(json!([p, i]), (i % 10) as i64).unwrap());
                if i % 25 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            ids
        }));
    }

    let mut uploaded = HashSet::new();
    for handle in producer_handles {
        uploaded.extend(handle.await.unwrap());
    }

    let mut consumed = Vec::new();
    for handle in consumer_handles {
        consumed.extend(handle.await.unwrap());
    }

    let unique: HashSet<_> = consumed.iter().cloned().collect();
    assert_eq!(consumed.len(), producers * per_producer);
    assert_eq!(unique, uploaded);
    assert!(tube.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_tubes_do_not_interfere() {
    let a = Arc::new(Tube::new("a", TubeOptions::default()));
    let b = Arc::new(Tube::new("b", TubeOptions::default()));

    let waiter = tokio::spawn({
        let a = Arc::clone(&a);
        async move { a.take(Some(Duration::from_millis(200))).await.unwrap() }
    });

    b.put(json!("for b"), 0).unwrap();

    assert!(waiter.await.unwrap().is_none());
    assert_eq!(b.stats().ready, 1);
}
