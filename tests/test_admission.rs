mod common;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use common::ManualClock;
use warden::limits::AdmissionController;

const A: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
const B: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

#[tokio::test]
async fn test_admits_exactly_limit_within_one_second() {
    for (limit, attempts) in [(5u32, 8usize), (5, 3), (1, 4), (0, 2)] {
        let controller = AdmissionController::with_clock(limit, ManualClock::at(100));

        let mut admitted = 0;
        for _ in 0..attempts {
            if controller.try_admit(A).await {
                admitted += 1;
            }
        }

        assert_eq!(admitted, attempts.min(limit as usize), "limit {} attempts {}", limit, attempts);
    }
}

#[tokio::test]
async fn test_addresses_are_counted_separately() {
    let controller = AdmissionController::with_clock(2, ManualClock::at(100));

    for _ in 0..5 {
        controller.try_admit(A).await;
    }

    assert!(controller.try_admit(B).await);
    assert!(controller.try_admit(B).await);
    assert!(!controller.try_admit(B).await);
}

#[tokio::test]
async fn test_rejected_attempts_still_count() {
    let controller = AdmissionController::with_clock(1, ManualClock::at(7));

    assert!(controller.try_admit(A).await);
    assert!(!controller.try_admit(A).await);
    assert!(!controller.try_admit(A).await);
    assert_eq!(controller.attempts(A).await, 3);
}

#[tokio::test]
async fn test_new_second_starts_fresh_window() {
    let clock = ManualClock::at(100);
    let controller = AdmissionController::with_clock(3, clock.clone());

    for _ in 0..3 {
        assert!(controller.try_admit(A).await);
    }
    assert!(!controller.try_admit(A).await);

    clock.advance(1);

    assert_eq!(controller.attempts(A).await, 0);
    for _ in 0..3 {
        assert!(controller.try_admit(A).await);
    }
    assert!(!controller.try_admit(A).await);
}

#[tokio::test]
async fn test_rollover_discards_every_address() {
    let clock = ManualClock::at(5);
    let controller = AdmissionController::with_clock(1, clock.clone());

    assert!(controller.try_admit(A).await);
    assert!(controller.try_admit(B).await);

    clock.advance(1);
    assert!(controller.try_admit(A).await);
    assert_eq!(controller.attempts(B).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_never_over_admit() {
    let controller = Arc::new(AdmissionController::with_clock(10, ManualClock::at(1)));

    let handles: Vec<_> = (0..200)
        .map(|_| {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.try_admit(A).await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 10);
    assert_eq!(controller.attempts(A).await, 200);
}

#[tokio::test]
async fn test_system_clock_controller_admits_first_request() {
    let controller = AdmissionController::new(5);
    assert_eq!(controller.limit(), 5);
    assert!(controller.try_admit(A).await);
}
