use pushmeter::{MeterConfig, MeterRegistry};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn local_config(interval: Duration) -> MeterConfig {
    MeterConfig {
        interval,
        gateway: None,
        metric_key: None,
        instance: "test".to_string(),
    }
}

#[test]
fn test_marks_from_many_threads_are_all_counted() {
    let registry = MeterRegistry::new(local_config(Duration::from_secs(1)));

    thread::scope(|scope| {
        for worker in 0..8 {
            let registry = &registry;
            scope.spawn(move || {
                let own_key = format!("worker-{}", worker);
                for _ in 0..5_000 {
                    registry.mark("shared");
                    registry.mark(&own_key);
                }
            });
        }
    });

    assert_eq!(registry.total("shared"), Some(40_000));
    for worker in 0..8 {
        assert_eq!(registry.total(&format!("worker-{}", worker)), Some(5_000));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reporting_does_not_lose_marks() {
    let registry = Arc::new(MeterRegistry::new(local_config(Duration::from_millis(50))));
    registry.start();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::task::spawn_blocking(move || {
            for _ in 0..10_000 {
                registry.mark("shared");
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Span at least one more cycle boundary while totals settle.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(registry.total("shared"), Some(40_000));

    registry.stop().await;
}
