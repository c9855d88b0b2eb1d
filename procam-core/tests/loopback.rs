use std::sync::Arc;

use parking_lot::Mutex;
use procam_core::prelude::*;
use procam_protocol::{CallbackCodec, FaceRecord, LockStatus, Message};
use procam_telemetry::MetricsRecorder;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Notify(i32, i32, i32),
    Data {
        msg_type: i32,
        pixels: Vec<u8>,
        faces: Option<Vec<FaceRecord>>,
    },
    Timestamp(i64, i32, usize),
    Lock(LockStatus),
    Result(i32, Option<Vec<u8>>),
}

#[derive(Default)]
struct Client {
    seen: Mutex<Vec<Seen>>,
}

impl ProCameraListener for Client {
    fn notify_callback(&self, msg_type: i32, ext1: i32, ext2: i32) {
        self.seen.lock().push(Seen::Notify(msg_type, ext1, ext2));
    }

    fn data_callback(&self, msg_type: i32, image: &ImageData, faces: Option<&[FaceRecord]>) {
        self.seen.lock().push(Seen::Data {
            msg_type,
            pixels: image.as_bytes().to_vec(),
            faces: faces.map(<[FaceRecord]>::to_vec),
        });
    }

    fn data_callback_timestamp(&self, timestamp: i64, msg_type: i32, image: &ImageData) {
        self.seen
            .lock()
            .push(Seen::Timestamp(timestamp, msg_type, image.len()));
    }

    fn on_lock_status_changed(&self, status: LockStatus) {
        self.seen.lock().push(Seen::Lock(status));
    }

    fn on_result_received(&self, frame_id: i32, metadata: Option<&[u8]>) {
        self.seen
            .lock()
            .push(Seen::Result(frame_id, metadata.map(<[u8]>::to_vec)));
    }
}

struct Harness {
    transport: Arc<LoopbackTransport>,
    endpoint: LoopbackEndpoint,
    pool: Arc<SharedMemoryPool>,
    client: Arc<Client>,
    sender: CallbackSender<Arc<LoopbackTransport>>,
    metrics: MetricsRecorder,
}

fn harness() -> Harness {
    let transport = Arc::new(LoopbackTransport::new());
    let destination = Destination::new("pro-camera-client");
    let endpoint = transport.bind(destination.clone());
    let pool = Arc::new(SharedMemoryPool::new());
    let client = Arc::new(Client::default());
    let metrics = MetricsRecorder::new().unwrap();

    let dispatcher = Arc::new(
        Dispatcher::new(client.clone(), pool.clone()).with_metrics(metrics.clone()),
    );
    endpoint.on_message(dispatcher.handler());

    let sender = CallbackSender::new(transport.clone(), destination).with_metrics(metrics.clone());
    Harness {
        transport,
        endpoint,
        pool,
        client,
        sender,
        metrics,
    }
}

fn face(id: i32) -> FaceRecord {
    FaceRecord {
        rect: [-100, -100, 100, 100],
        score: 95,
        id,
        left_eye: [-40, -30],
        right_eye: [40, -30],
        mouth: [0, 50],
    }
}

#[test]
fn every_kind_arrives_once_and_in_order() {
    let h = harness();
    let frame = h.pool.share(vec![0xABu8; 64]).unwrap();

    h.sender.notify_callback(1, 2, 3).unwrap();
    h.sender
        .data_callback(0x10, &frame, Some(&[face(1), face(2)][..]))
        .unwrap();
    h.sender.data_callback_timestamp(1_234_567, 0x20, &frame).unwrap();
    h.sender.on_lock_status_changed(LockStatus::Acquired).unwrap();
    h.sender.on_result_received(7, b"android.sensor").unwrap();

    assert_eq!(h.endpoint.deliver_pending(), 5);
    assert_eq!(
        *h.client.seen.lock(),
        vec![
            Seen::Notify(1, 2, 3),
            Seen::Data {
                msg_type: 0x10,
                pixels: vec![0xAB; 64],
                faces: Some(vec![face(1), face(2)]),
            },
            Seen::Timestamp(1_234_567, 0x20, 64),
            Seen::Lock(LockStatus::Acquired),
            Seen::Result(7, Some(b"android.sensor".to_vec())),
        ]
    );
    assert_eq!(h.metrics.dispatched("data"), 1);
    assert_eq!(h.metrics.sent.with_label_values(&["notify"]).get(), 1);
}

#[test]
fn negative_notify_arguments_survive() {
    let h = harness();
    h.sender.notify_callback(3, -1, 42).unwrap();
    assert_eq!(h.endpoint.deliver_pending(), 1);
    assert_eq!(*h.client.seen.lock(), vec![Seen::Notify(3, -1, 42)]);
}

#[test]
fn absent_and_empty_optionals_are_distinguished() {
    let h = harness();
    let frame = h.pool.share(vec![1u8, 2]).unwrap();

    h.sender.data_callback(1, &frame, None).unwrap();
    h.sender.data_callback(1, &frame, Some(&[][..])).unwrap();
    h.sender.on_result_received(3, &[]).unwrap();
    h.endpoint.deliver_pending();

    let seen = h.client.seen.lock();
    assert!(matches!(&seen[0], Seen::Data { faces: None, .. }));
    assert!(matches!(&seen[1], Seen::Data { faces: Some(f), .. } if f.is_empty()));
    assert_eq!(seen[2], Seen::Result(3, None));
}

#[test]
fn released_heap_refuses_delivery() {
    let h = harness();
    let frame = h.pool.share(vec![5u8; 8]).unwrap();
    h.pool.release(frame.heap_id);

    h.sender.data_callback(1, &frame, None).unwrap();
    h.endpoint.deliver_pending();

    assert!(h.client.seen.lock().is_empty());
    assert_eq!(h.metrics.rejected("unresolved_buffer"), 1);
}

#[test]
fn foreign_and_malformed_messages_are_counted_not_delivered() {
    let h = harness();
    let destination = h.sender.destination().clone();
    let foreign = CallbackCodec::new().with_descriptor("android.hardware.ICameraClient");

    h.transport
        .send(&destination, foreign.encode_notify(1, 1, 1), SendFlags::ONE_WAY)
        .unwrap();
    h.transport
        .send(&destination, Message::from_bytes(vec![0u8; 3]), SendFlags::ONE_WAY)
        .unwrap();
    h.sender.notify_callback(9, 9, 9).unwrap();
    h.endpoint.deliver_pending();

    assert_eq!(*h.client.seen.lock(), vec![Seen::Notify(9, 9, 9)]);
    assert_eq!(h.metrics.rejected("protocol_mismatch"), 1);
    assert_eq!(h.metrics.rejected("truncated"), 1);
}

#[test]
fn sender_reports_unbound_destination() {
    let h = harness();
    h.transport.unbind(h.sender.destination());
    drop(h.endpoint);

    assert!(matches!(
        h.sender.notify_callback(0, 0, 0),
        Err(TransportError::UnknownDestination(_))
    ));
    assert_eq!(h.metrics.send_failures.get(), 1);
}

#[test]
fn threaded_server_drains_before_exit() {
    let Harness {
        transport,
        endpoint,
        client,
        sender,
        ..
    } = harness();

    let server = std::thread::spawn(move || endpoint.serve());
    for i in 0..100 {
        sender.notify_callback(i, 0, 0).unwrap();
    }
    transport.unbind(sender.destination());
    assert_eq!(server.join().unwrap(), 100);

    let seen = client.seen.lock();
    let order: Vec<i32> = seen
        .iter()
        .map(|s| match s {
            Seen::Notify(n, _, _) => *n,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(order, (0..100).collect::<Vec<_>>());
}
