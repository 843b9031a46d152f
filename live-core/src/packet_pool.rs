use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, RwLock, atomic::AtomicBool, atomic::Ordering},
};

use crate::{
    listener::{NoopListener, PublishEventListener},
    packet::{AudioPacket, VideoPacket, nal_type},
    queue::{GetResult, PacketQueue},
};

pub const VIDEO_QUEUE_THRESHOLD: usize = 60;
pub const AUDIO_PACKET_DURATION_MS: f64 = 40.0;

/// Sentinel meaning "no GOP has been dropped yet, hand out packets' own timestamps as-is".
const NON_DROP_FRAME_FLAG: f64 = f64::MIN;

/// Video queue state: the backlog plus the output clock used to rewrite timestamps once
/// a drop has happened, kept under one lock so a drop and a concurrent `get` never race.
struct VideoState {
    items: VecDeque<VideoPacket>,
    current_time_mills: f64,
}

struct VideoQueue {
    state: Mutex<VideoState>,
    not_empty: Condvar,
    aborted: AtomicBool,
}

impl VideoQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(VideoState {
                items: VecDeque::new(),
                current_time_mills: NON_DROP_FRAME_FLAG,
            }),
            not_empty: Condvar::new(),
            aborted: AtomicBool::new(false),
        }
    }

    fn put(&self, pkt: VideoPacket) {
        if self.aborted.load(Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.items.push_back(pkt);
        self.not_empty.notify_one();
    }

    fn size(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.not_empty.notify_all();
    }

    fn flush(&self) {
        let mut state = self.state.lock().unwrap();
        state.items.clear();
        state.current_time_mills = NON_DROP_FRAME_FLAG;
    }
}

/// Outcome of one `discard_gop` pass over the head of the video queue.
#[derive(Debug)]
enum GopDrop {
    /// A GOP prefix was dropped; `duration_ms` is the summed duration of the dropped frames.
    Dropped {
        duration_ms: f64,
    },
    /// The head is a parameter-set NAL (SPS/PPS) or the queue ran dry mid-GOP; unsafe to
    /// drop further this pass.
    Unsafe,
    Aborted,
}

/// Owns the PCM queue (chunked into 40ms windows) and the H.264 queue, with GOP-aware
/// drop under congestion and a coupled audio-discard credit to keep A/V sync.
pub struct LivePacketPool {
    pcm_queue: PacketQueue<AudioPacket>,
    pcm_buffer: Mutex<PcmAggregator>,

    video: VideoQueue,
    pending_video: Mutex<Option<VideoPacket>>,

    total_discard_video_ms: RwLock<f64>,
    listener: std::sync::Arc<dyn PublishEventListener>,
}

struct PcmAggregator {
    buffer: Vec<i16>,
    buffer_size: usize,
    cursor: usize,
}

impl LivePacketPool {
    pub fn new(sample_rate: u32, channels: u32) -> Self {
        Self::with_listener(sample_rate, channels, std::sync::Arc::new(NoopListener))
    }

    pub fn with_listener(
        sample_rate: u32,
        channels: u32,
        listener: std::sync::Arc<dyn PublishEventListener>,
    ) -> Self {
        let buffer_size = (sample_rate as f64 * channels as f64 * 0.04).round() as usize;
        Self {
            pcm_queue: PacketQueue::new("audioPacket pcm data queue"),
            pcm_buffer: Mutex::new(PcmAggregator {
                buffer: vec![0i16; buffer_size],
                buffer_size,
                cursor: 0,
            }),
            video: VideoQueue::new(),
            pending_video: Mutex::new(None),
            total_discard_video_ms: RwLock::new(0.0),
            listener,
        }
    }

    // ---- PCM path ----

    /// Slices `pkt`'s samples into 40ms windows, enqueuing each as a fresh `AudioPacket`
    /// once the aggregator buffer fills.
    pub fn push_audio(&self, pkt: AudioPacket) {
        let samples = match pkt.as_pcm() {
            Some(samples) => samples,
            None => return,
        };
        let mut agg = self.pcm_buffer.lock().unwrap();
        let mut offset = 0;
        while offset < samples.len() {
            let available = agg.buffer_size - agg.cursor;
            let len = available.min(samples.len() - offset);
            let cursor = agg.cursor;
            agg.buffer[cursor..cursor + len].copy_from_slice(&samples[offset..offset + len]);
            agg.cursor += len;
            offset += len;
            if agg.cursor == agg.buffer_size {
                let chunk = agg.buffer.clone();
                self.pcm_queue.put(AudioPacket::pcm(chunk, pkt.position));
                agg.cursor = 0;
            }
        }
    }

    pub fn get_audio(&self, block: bool) -> GetResult<AudioPacket> {
        self.pcm_queue.get(block)
    }

    pub fn audio_queue_size(&self) -> usize {
        self.pcm_queue.size()
    }

    pub fn abort_audio_queue(&self) {
        self.pcm_queue.abort();
    }

    pub fn flush_audio_queue(&self) {
        self.pcm_queue.flush();
    }

    // ---- Video path ----

    /// Drops GOP prefixes while the queue is over threshold, then enqueues the previous
    /// pending packet (now that its duration is known from `pkt`'s arrival) and makes
    /// `pkt` the new pending one. Returns `true` iff any drop occurred.
    pub fn push_video(&self, pkt: VideoPacket) -> bool {
        let mut dropped = false;
        while self.video.size() > VIDEO_QUEUE_THRESHOLD {
            match self.discard_gop() {
                GopDrop::Dropped { duration_ms } => {
                    dropped = true;
                    *self.total_discard_video_ms.write().unwrap() += duration_ms;
                }
                GopDrop::Unsafe | GopDrop::Aborted => break,
            }
        }

        let mut pending = self.pending_video.lock().unwrap();
        if let Some(mut prev) = pending.take() {
            prev.duration = pkt.time_mills - prev.time_mills;
            self.video.put(prev);
        }
        *pending = Some(pkt);

        if dropped {
            self.listener.on_video_packet_dropped();
        }
        dropped
    }

    /// Pops a GOP prefix from the head: the first IDR (if any) plus every following
    /// non-IDR frame, stopping at the next IDR. A SPS/PPS NAL at the head means we're
    /// mid-parameter-set and it is unsafe to keep dropping this pass.
    fn discard_gop(&self) -> GopDrop {
        let mut state = self.video.state.lock().unwrap();
        if self.video.aborted.load(Ordering::SeqCst) {
            return GopDrop::Aborted;
        }

        let mut first_is_idr = matches!(
            state.items.front().and_then(VideoPacket::nal_type),
            Some(nal_type::IDR_PICTURE)
        );
        let mut duration_ms = 0.0;
        let mut any_dropped = false;

        loop {
            let Some(nal) = state.items.front().and_then(VideoPacket::nal_type) else {
                break;
            };
            match nal {
                nal_type::IDR_PICTURE => {
                    if first_is_idr {
                        first_is_idr = false;
                    } else {
                        break;
                    }
                }
                nal_type::NON_IDR_PICTURE => {}
                // A parameter-set NAL reaching the head mid-call means we're in an
                // unsafe spot to keep dropping; the whole call is discarded, not just
                // the frames popped so far this pass.
                _ => return GopDrop::Unsafe,
            }
            let pkt = state.items.pop_front().expect("front checked above");
            any_dropped = true;
            duration_ms += pkt.duration;
        }

        if any_dropped {
            GopDrop::Dropped { duration_ms }
        } else {
            GopDrop::Unsafe
        }
    }

    /// Blocks (if `block`) until a packet is available, then hands it back with its
    /// timestamp rewritten to the pool's output clock if a drop has happened: once
    /// dropping starts, `current_time_mills` advances by each packet's own `duration`
    /// rather than jumping to the packet's original (now-discontinuous) `time_mills`.
    pub fn get_video(&self, block: bool) -> GetResult<VideoPacket> {
        let mut state = self.video.state.lock().unwrap();
        loop {
            if self.video.aborted.load(Ordering::SeqCst) {
                return GetResult::Aborted;
            }
            if let Some(mut pkt) = state.items.pop_front() {
                if state.current_time_mills == NON_DROP_FRAME_FLAG {
                    state.current_time_mills = pkt.time_mills;
                } else {
                    state.current_time_mills += pkt.duration;
                    pkt.time_mills = state.current_time_mills;
                }
                return GetResult::Packet(pkt);
            }
            if !block {
                return GetResult::Empty;
            }
            state = self.video.not_empty.wait(state).unwrap();
        }
    }

    pub fn video_queue_size(&self) -> usize {
        self.video.size()
    }

    pub fn abort_video_queue(&self) {
        self.video.abort();
    }

    pub fn flush_video_queue(&self) {
        self.video.flush();
        *self.pending_video.lock().unwrap() = None;
    }

    // ---- Audio drop credit ----

    /// `true` once enough video has been dropped to owe a 40ms audio discard.
    pub fn detect_discard_audio(&self) -> bool {
        *self.total_discard_video_ms.read().unwrap() >= AUDIO_PACKET_DURATION_MS
    }

    /// Consumes and drops one PCM packet, repaying 40ms of the video-drop credit.
    pub fn discard_audio(&self) -> bool {
        match self.pcm_queue.get(true) {
            GetResult::Packet(_) => {
                *self.total_discard_video_ms.write().unwrap() -= AUDIO_PACKET_DURATION_MS;
                true
            }
            GetResult::Aborted | GetResult::Empty => false,
        }
    }

    pub fn total_discard_video_ms(&self) -> f64 {
        *self.total_discard_video_ms.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn nal_packet(nal: u8, time_mills: f64) -> VideoPacket {
        let mut buf = vec![0, 0, 0, 1, nal];
        buf.extend_from_slice(&[0u8; 4]);
        let mut pkt = VideoPacket::new(Bytes::from(buf), time_mills);
        pkt.duration = 33.0;
        pkt
    }

    #[test]
    fn push_audio_chunks_into_40ms_windows() {
        let pool = LivePacketPool::new(16_000, 1);
        let samples = vec![1i16; 640 * 3];
        pool.push_audio(AudioPacket::pcm(samples, 0.0));
        assert_eq!(pool.audio_queue_size(), 3);
    }

    #[test]
    fn gop_drop_preserves_first_idr_and_stops_at_next_idr() {
        let pool = LivePacketPool::new(16_000, 1);
        pool.push_video(nal_packet(nal_type::IDR_PICTURE, 0.0));
        for i in 1..=(VIDEO_QUEUE_THRESHOLD + 5) {
            pool.push_video(nal_packet(nal_type::NON_IDR_PICTURE, i as f64 * 33.0));
        }
        pool.push_video(nal_packet(
            nal_type::IDR_PICTURE,
            (VIDEO_QUEUE_THRESHOLD as f64 + 6.0) * 33.0,
        ));

        assert!(pool.video_queue_size() <= VIDEO_QUEUE_THRESHOLD);
        assert!(pool.total_discard_video_ms() > 0.0);
    }

    #[test]
    fn audio_credit_of_200ms_drains_exactly_five_pcm_packets() {
        let pool = LivePacketPool::new(16_000, 1);
        for _ in 0..10 {
            pool.push_audio(AudioPacket::pcm(vec![0i16; 640], 0.0));
        }
        assert_eq!(pool.audio_queue_size(), 10);

        *pool.total_discard_video_ms.write().unwrap() = 200.0;
        let mut dropped = 0;
        while pool.detect_discard_audio() {
            assert!(pool.discard_audio());
            dropped += 1;
        }

        assert_eq!(dropped, 5);
        assert_eq!(pool.audio_queue_size(), 5);
        assert!((pool.total_discard_video_ms()).abs() < f64::EPSILON);
    }

    #[test]
    fn push_video_notifies_listener_only_when_a_drop_occurs() {
        use std::sync::{Arc, atomic::AtomicUsize};

        struct CountingListener(AtomicUsize);
        impl PublishEventListener for CountingListener {
            fn on_video_packet_dropped(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let listener = Arc::new(CountingListener(AtomicUsize::new(0)));
        let pool = LivePacketPool::with_listener(16_000, 1, listener.clone());

        pool.push_video(nal_packet(nal_type::IDR_PICTURE, 0.0));
        for i in 1..=(VIDEO_QUEUE_THRESHOLD + 5) {
            pool.push_video(nal_packet(nal_type::NON_IDR_PICTURE, i as f64 * 33.0));
        }
        pool.push_video(nal_packet(
            nal_type::IDR_PICTURE,
            (VIDEO_QUEUE_THRESHOLD as f64 + 6.0) * 33.0,
        ));
        assert!(listener.0.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn audio_credit_is_repaid_one_packet_at_a_time() {
        let pool = LivePacketPool::new(16_000, 1);
        pool.push_audio(AudioPacket::pcm(vec![0i16; 640 * 2], 0.0));
        assert!(!pool.detect_discard_audio());

        *pool.total_discard_video_ms.write().unwrap() = 45.0;
        assert!(pool.detect_discard_audio());
        assert!(pool.discard_audio());
        assert!((pool.total_discard_video_ms() - 5.0).abs() < f64::EPSILON);
        assert!(!pool.detect_discard_audio());
    }

    #[test]
    fn discard_gop_stopping_on_a_parameter_set_credits_nothing() {
        let pool = LivePacketPool::new(16_000, 1);
        // Each push_video call only enqueues the *previous* pending packet once the next
        // one arrives (duration is derived from the gap), so one extra push is needed to
        // land the SPS packet itself in the queue rather than leaving it pending.
        pool.push_video(nal_packet(nal_type::IDR_PICTURE, 0.0));
        pool.push_video(nal_packet(nal_type::NON_IDR_PICTURE, 33.0));
        pool.push_video(nal_packet(nal_type::NON_IDR_PICTURE, 66.0));
        pool.push_video(nal_packet(nal_type::SPS, 99.0));
        pool.push_video(nal_packet(nal_type::IDR_PICTURE, 132.0));

        match pool.discard_gop() {
            GopDrop::Unsafe => {}
            other => panic!(
                "expected Unsafe when the pass stops on a parameter set, got a result that would credit a partial drop instead: {other:?}"
            ),
        }
        assert!((pool.total_discard_video_ms()).abs() < f64::EPSILON);
    }
}
