//! The receiving application's callback surface.

use std::sync::Arc;

use procam_protocol::{FaceRecord, LockStatus};

use crate::buffer::ImageData;

/// Five callbacks, one per event kind.
///
/// Each call happens on the thread that delivered the transaction. Borrowed
/// arguments are valid only for the duration of the call.
pub trait ProCameraListener: Send + Sync {
    fn notify_callback(&self, msg_type: i32, ext1: i32, ext2: i32);

    /// `faces` is `None` when the sender attached no face block and
    /// `Some(&[])` when it attached an empty one.
    fn data_callback(&self, msg_type: i32, image: &ImageData, faces: Option<&[FaceRecord]>);

    fn data_callback_timestamp(&self, timestamp: i64, msg_type: i32, image: &ImageData);

    fn on_lock_status_changed(&self, status: LockStatus);

    /// `metadata` is `None` when the result carried no metadata.
    fn on_result_received(&self, frame_id: i32, metadata: Option<&[u8]>);
}

impl<L: ProCameraListener + ?Sized> ProCameraListener for Arc<L> {
    fn notify_callback(&self, msg_type: i32, ext1: i32, ext2: i32) {
        (**self).notify_callback(msg_type, ext1, ext2)
    }

    fn data_callback(&self, msg_type: i32, image: &ImageData, faces: Option<&[FaceRecord]>) {
        (**self).data_callback(msg_type, image, faces)
    }

    fn data_callback_timestamp(&self, timestamp: i64, msg_type: i32, image: &ImageData) {
        (**self).data_callback_timestamp(timestamp, msg_type, image)
    }

    fn on_lock_status_changed(&self, status: LockStatus) {
        (**self).on_lock_status_changed(status)
    }

    fn on_result_received(&self, frame_id: i32, metadata: Option<&[u8]>) {
        (**self).on_result_received(frame_id, metadata)
    }
}
