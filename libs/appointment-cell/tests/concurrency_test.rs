use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use futures::future::join_all;

use appointment_cell::services::{AppointmentRepository, AvailabilityResolver, InMemoryStore};
use appointment_cell::{AppointmentDraft, AppointmentError, AvailabilityWindow, SlotStatus};
use shared_utils::test_utils::utc;

fn draft(name: &str, service: &str, start: &str) -> AppointmentDraft {
    AppointmentDraft {
        name: name.to_string(),
        phone_number: "555 0100".to_string(),
        service: service.to_string(),
        start: start.to_string(),
        tz_offset: None,
    }
}

fn repository() -> Arc<AppointmentRepository> {
    Arc::new(AppointmentRepository::new(Arc::new(InMemoryStore::new())))
}

#[tokio::test]
async fn test_concurrent_overlapping_creates_admit_one() {
    let repository = repository();

    let attempts = (0..8).map(|i| {
        let repository = Arc::clone(&repository);
        tokio::spawn(async move {
            let start = format!("2024-01-01T10:{:02}:00Z", i * 5);
            repository.create(draft(&format!("Patient {}", i), "treatment", &start)).await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppointmentError::Conflict { .. })));

    assert_eq!(repository.list().await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_disjoint_creates_all_land() {
    let repository = repository();

    let attempts = (0..6).map(|i| {
        let repository = Arc::clone(&repository);
        tokio::spawn(async move {
            let start = format!("2024-01-01T{:02}:00:00Z", 9 + i);
            repository.create(draft(&format!("Patient {}", i), "extraction", &start)).await
        })
    });

    for joined in join_all(attempts).await {
        assert!(joined.expect("task panicked").is_ok());
    }

    let snapshot = repository.snapshot().await;
    assert_eq!(snapshot.appointments.len(), 6);
    assert_eq!(snapshot.generation, 6);
    for pair in snapshot.appointments.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
}

#[tokio::test]
async fn test_resolver_sees_write_from_another_task() {
    let repository = repository();
    let resolver = Arc::new(AvailabilityResolver::new(Arc::clone(&repository)));
    let window = AvailabilityWindow::default();
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let before = resolver.resolve(date, &window, 0).await;
    assert!(before.iter().all(|slot| slot.status == SlotStatus::Available));

    let writer = {
        let repository = Arc::clone(&repository);
        tokio::spawn(async move {
            repository
                .create(draft("Writer", "consultation", "2024-01-01T14:00:00Z"))
                .await
        })
    };
    let created = writer.await.expect("task panicked").expect("create failed");

    let after = resolver.resolve(date, &window, 0).await;
    let busy: Vec<_> = after
        .iter()
        .filter(|slot| slot.status == SlotStatus::Busy)
        .collect();
    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].start, utc(2024, 1, 1, 14, 0));
    assert_eq!(busy[0].appointment_id, Some(created.id));
}

#[tokio::test]
async fn test_subscribers_observe_every_generation() {
    let repository = repository();
    let mut receiver = repository.subscribe();

    let created = repository
        .create(draft("Watcher", "consultation", "2024-01-01T09:00:00Z"))
        .await
        .unwrap();
    receiver.changed().await.unwrap();
    assert_eq!(receiver.borrow_and_update().generation, 1);

    repository.delete(created.id).await.unwrap();
    receiver.changed().await.unwrap();
    let signal = *receiver.borrow_and_update();
    assert_eq!(signal.generation, 2);
    assert_eq!(signal.change.map(|c| c.appointment_id), Some(created.id));

    // Rejected writes publish nothing.
    let first = repository
        .create(draft("First", "treatment", "2024-01-01T10:00:00Z"))
        .await
        .unwrap();
    receiver.changed().await.unwrap();
    let _ = receiver.borrow_and_update();

    let rejected = repository
        .create(draft("Second", "consultation", "2024-01-01T10:30:00Z"))
        .await;
    assert!(rejected.is_err());
    assert!(!receiver.has_changed().unwrap());
    assert_eq!(repository.snapshot().await.generation, 3);
    assert_eq!(first.end - first.start, Duration::minutes(45));
}
