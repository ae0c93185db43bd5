use intersection_control::simulation_engine::parking::ParkingFacility;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, timeout, Duration};

#[tokio::test(start_paused = true)]
async fn hundred_vehicles_contend_without_sharing_a_spot() {
    let facility = Arc::new(ParkingFacility::new(10, 5));
    let held_spots = Arc::new(Mutex::new(HashSet::new()));
    let held_slots = Arc::new(Mutex::new(HashSet::new()));

    let mut handles = Vec::new();
    for i in 0..100u64 {
        let facility = Arc::clone(&facility);
        let held_spots = Arc::clone(&held_spots);
        let held_slots = Arc::clone(&held_slots);
        handles.push(tokio::spawn(async move {
            let slot = loop {
                if let Some(slot) = facility.enter_queue() {
                    break slot;
                }
                sleep(Duration::from_millis(5)).await;
            };
            assert!(held_slots.lock().unwrap().insert(slot.index()));
            let slot_index = slot.index();

            let spot = facility.wait_for_spot(slot).await;
            held_slots.lock().unwrap().remove(&slot_index);
            assert!(
                held_spots.lock().unwrap().insert(spot.index()),
                "spot {} handed out twice",
                spot.index()
            );

            let snapshot = facility.snapshot();
            assert!(snapshot.occupied <= 10);
            assert!(snapshot.waiting <= 5);
            assert!(snapshot.spots[spot.index()]);

            sleep(Duration::from_millis(10 + i % 7)).await;
            held_spots.lock().unwrap().remove(&spot.index());
            facility.leave(spot);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = facility.snapshot();
    assert_eq!(snapshot.occupied, 0);
    assert_eq!(snapshot.waiting, 0);
    assert!(snapshot.spots.iter().all(|taken| !taken));
    assert!(snapshot.queue_slots.iter().all(|taken| !taken));
}

#[tokio::test(start_paused = true)]
async fn full_queue_rejects_without_blocking() {
    let facility = ParkingFacility::new(1, 1);

    let first = facility.enter_queue().unwrap();
    let spot = facility.wait_for_spot(first).await;
    let waiting = facility.enter_queue().unwrap();
    assert_eq!(waiting.index(), 0);
    assert_eq!(facility.waiting_count(), 1);

    assert!(facility.enter_queue().is_none());
    assert_eq!(facility.waiting_count(), 1);

    // The waiter stays blocked until the spot is handed back.
    let facility = Arc::new(facility);
    let waiter = {
        let facility = Arc::clone(&facility);
        tokio::spawn(async move { facility.wait_for_spot(waiting).await })
    };
    sleep(Duration::from_secs(60)).await;
    assert!(!waiter.is_finished());
    assert_eq!(facility.occupied_count(), 1);

    facility.leave(spot);
    let second = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert_eq!(second.index(), 0);
    assert_eq!(facility.waiting_count(), 0);
    assert_eq!(facility.occupied_count(), 1);

    // The queue slot came back once the spot was taken.
    assert!(facility.enter_queue().is_some());
}

#[tokio::test(start_paused = true)]
async fn waiters_are_served_in_arrival_order() {
    let facility = Arc::new(ParkingFacility::new(1, 3));
    let blocker = facility.enter_queue().unwrap();
    let blocker = facility.wait_for_spot(blocker).await;

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for n in 0..3 {
        let slot = facility.enter_queue().unwrap();
        let facility = Arc::clone(&facility);
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let spot = facility.wait_for_spot(slot).await;
            order.lock().unwrap().push(n);
            sleep(Duration::from_millis(100)).await;
            facility.leave(spot);
        }));
        // Make sure each waiter is parked on the semaphore before the next.
        sleep(Duration::from_millis(1)).await;
    }

    facility.leave(blocker);
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}
