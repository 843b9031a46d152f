/// Notifications the embedder of this pipeline cares about. Modeled as an explicit
/// interface (rather than a callback + opaque context pointer) so `ConsumerThread` and
/// `LivePacketPool` just hold a `dyn PublishEventListener` reference.
///
/// Every method has a no-op default; implementors override only what they observe.
pub trait PublishEventListener: Send + Sync {
    /// The RTMP publish session is up and the first A/V sequence headers can flow.
    fn on_connect_success(&self) {}

    /// `init` failed or was cancelled before completing; `reason` is a short description.
    fn on_connect_failed(&self, _reason: &str) {}

    /// The publisher's socket stalled past `publish_timeout` and the session was torn down.
    fn on_publish_timeout(&self) {}

    /// `LivePacketPool::push_video` discarded a GOP prefix to relieve backpressure.
    fn on_video_packet_dropped(&self) {}
}

/// Listener that discards every notification; the default when the embedder doesn't
/// care to observe session lifecycle events.
pub struct NoopListener;

impl PublishEventListener for NoopListener {}
