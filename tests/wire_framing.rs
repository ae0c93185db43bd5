use intersection_control::communication::channels::update_channel;
use intersection_control::communication::framing::encode_frame;
use intersection_control::communication::messages::{
    CommandMessage, LightUpdate, ParkingUpdate, ScenarioCommand, UpdateMessage,
};
use intersection_control::global_variables::MSG_MAGIC;
use intersection_control::monitoring::traffic_monitoring_system::Collector;
use intersection_control::simulation_engine::intersections::{IntersectionId, LightState};

fn green(intersection_id: IntersectionId) -> UpdateMessage {
    UpdateMessage::LightUpdate(LightUpdate {
        intersection_id,
        state: LightState::Green,
    })
}

#[tokio::test]
async fn receiver_realigns_after_corrupt_input() {
    let (tx, mut rx) = update_channel();

    tx.send_raw(vec![0x00, 0xCA, 0xFE]).unwrap();
    tx.send(&green(IntersectionId::F10)).unwrap();
    // A command frame on the update stream carries the wrong marker.
    tx.send_raw(encode_frame(&CommandMessage::new(ScenarioCommand::GreenWave)).unwrap())
        .unwrap();
    // Right marker, body that is not an update.
    let body = br#"{"type":"Nope"}"#;
    let mut bogus = MSG_MAGIC.to_be_bytes().to_vec();
    bogus.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bogus.extend_from_slice(body);
    tx.send_raw(bogus).unwrap();
    // A valid frame split across two writes.
    let frame = encode_frame(&UpdateMessage::ParkingUpdate(ParkingUpdate {
        intersection_id: IntersectionId::F10,
        waiting_count: 4,
    }))
    .unwrap();
    tx.send_raw(frame[..6].to_vec()).unwrap();
    tx.send_raw(frame[6..].to_vec()).unwrap();
    drop(tx);

    assert_eq!(rx.recv().await, Some(green(IntersectionId::F10)));
    assert!(matches!(
        rx.recv().await,
        Some(UpdateMessage::ParkingUpdate(ParkingUpdate { waiting_count: 4, .. }))
    ));
    assert_eq!(rx.recv().await, None);
    assert!(rx.discarded() >= 3);
}

#[test]
fn collector_drains_what_is_readable() {
    let (tx, mut rx) = update_channel();
    tx.send(&green(IntersectionId::F11)).unwrap();
    tx.send(&UpdateMessage::ParkingUpdate(ParkingUpdate {
        intersection_id: IntersectionId::F11,
        waiting_count: 2,
    }))
    .unwrap();

    let mut collector = Collector::new();
    assert_eq!(collector.drain(IntersectionId::F11, &mut rx).unwrap(), 2);
    assert_eq!(collector.light(IntersectionId::F11), Some(LightState::Green));
    assert_eq!(collector.waiting_count(IntersectionId::F11), Some(2));

    // Nothing new yet; the sender is still alive.
    assert_eq!(collector.drain(IntersectionId::F11, &mut rx).unwrap(), 0);
}
