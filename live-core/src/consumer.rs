use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use rtmp::{RtmpClientConfig, RtmpError};
use tracing::{error, info, warn};

use crate::{
    aac_pool::AacPacketPool,
    error::{CLIENT_CANCEL_CONNECT, PublisherError},
    listener::{NoopListener, PublishEventListener},
    packet_pool::LivePacketPool,
    publisher::Publisher,
    queue::GetResult,
};

pub struct ConsumerThreadOptions {
    pub rtmp_config: RtmpClientConfig,
    pub audio_extradata: bytes::Bytes,
    pub video_pool: Arc<LivePacketPool>,
    pub audio_pool: Arc<AacPacketPool>,
    pub listener: Arc<dyn PublishEventListener>,
}

impl ConsumerThreadOptions {
    pub fn new(
        rtmp_config: RtmpClientConfig,
        audio_extradata: bytes::Bytes,
        video_pool: Arc<LivePacketPool>,
        audio_pool: Arc<AacPacketPool>,
    ) -> Self {
        Self {
            rtmp_config,
            audio_extradata,
            video_pool,
            audio_pool,
            listener: Arc::new(NoopListener),
        }
    }
}

/// Owns the publish connection and the loop that drains `video_pool`/`audio_pool` onto
/// it. `stop()` can race a connect attempt still in flight; `connecting` plus
/// `cancel_requested` record that race so a cancel during `RtmpClient::connect` is
/// honored the instant connect returns, instead of silently publishing anyway.
pub struct ConsumerThread {
    connecting: Mutex<bool>,
    cancel_requested: AtomicBool,
    stopped: AtomicBool,
    video_pool: Arc<LivePacketPool>,
    audio_pool: Arc<AacPacketPool>,
    join_handle: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl ConsumerThread {
    pub fn spawn(opts: ConsumerThreadOptions) -> Arc<Self> {
        let video_pool = Arc::clone(&opts.video_pool);
        let audio_pool = Arc::clone(&opts.audio_pool);
        let handle = Arc::new(Self {
            connecting: Mutex::new(true),
            cancel_requested: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            video_pool,
            audio_pool,
            join_handle: Mutex::new(None),
        });
        let thread_handle = Arc::clone(&handle);
        let join_handle = std::thread::Builder::new()
            .name("ConsumerThread".to_string())
            .spawn(move || thread_handle.run(opts))
            .expect("failed to spawn consumer thread");
        *handle.join_handle.lock().unwrap() = Some(join_handle);
        handle
    }

    fn run(&self, opts: ConsumerThreadOptions) {
        let publisher = match self.connect(opts.rtmp_config, opts.audio_extradata) {
            Ok(publisher) => publisher,
            Err(err) => {
                opts.listener.on_connect_failed(&err.to_string());
                error!(?err, "failed to establish publish session");
                return;
            }
        };
        let Some(mut publisher) = publisher else {
            opts.listener.on_connect_failed("cancelled");
            info!("publish connect cancelled before it completed");
            return;
        };
        opts.listener.on_connect_success();

        self.handle_run(
            &mut publisher,
            &opts.video_pool,
            &opts.audio_pool,
            opts.listener.as_ref(),
        );
        publisher.stop();
    }

    /// Returns `Ok(None)` if cancelled mid-connect (`CLIENT_CANCEL_CONNECT`), matching
    /// the upstream convention of treating cancellation as a benign early exit rather
    /// than an error.
    fn connect(
        &self,
        rtmp_config: RtmpClientConfig,
        audio_extradata: bytes::Bytes,
    ) -> Result<Option<Publisher>, PublisherError> {
        {
            let connecting = self.connecting.lock().unwrap();
            if !*connecting {
                return Ok(None);
            }
        }

        let mut publisher = Publisher::connect(rtmp_config)?;

        let mut connecting = self.connecting.lock().unwrap();
        *connecting = false;
        if self.cancel_requested.load(Ordering::SeqCst) {
            info!(code = CLIENT_CANCEL_CONNECT, "connect cancelled by stop()");
            return Ok(None);
        }
        drop(connecting);

        publisher.send_audio_config(audio_extradata)?;
        Ok(Some(publisher))
    }

    /// Interleaves audio and video onto the wire by presentation time, one packet per
    /// iteration: whichever stream's last-written timestamp trails the other is pulled
    /// next, matching the muxer's own interleaving rule rather than writing strictly in
    /// queue-arrival order.
    fn handle_run(
        &self,
        publisher: &mut Publisher,
        video_pool: &LivePacketPool,
        audio_pool: &AacPacketPool,
        listener: &dyn PublishEventListener,
    ) {
        let mut last_video_pts_secs = 0.0_f64;
        let mut last_audio_pts_secs = 0.0_f64;

        loop {
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }

            if should_write_audio_next(last_audio_pts_secs, last_video_pts_secs) {
                match audio_pool.get(true) {
                    GetResult::Packet(pkt) => {
                        last_audio_pts_secs = pkt.position / 1000.0;
                        if let Err(err) = publisher.write_audio_frame(&pkt) {
                            if Self::report_timeout(&err, listener) {
                                return;
                            }
                            error!(?err, "failed to write audio frame");
                            return;
                        }
                    }
                    GetResult::Aborted => {
                        let err = PublisherError::AudioQueueAborted;
                        info!(
                            code = err.as_abort_code(),
                            "audio queue aborted, stopping consumer"
                        );
                        return;
                    }
                    GetResult::Empty => unreachable!("blocking get never returns Empty"),
                }
            } else {
                match video_pool.get_video(true) {
                    GetResult::Packet(pkt) => {
                        last_video_pts_secs = pkt.time_mills / 1000.0;
                        if let Err(err) = publisher.write_video_frame(&pkt) {
                            if Self::report_timeout(&err, listener) {
                                return;
                            }
                            error!(?err, "failed to write video frame");
                            return;
                        }
                    }
                    GetResult::Aborted => {
                        let err = PublisherError::VideoQueueAborted;
                        info!(
                            code = err.as_abort_code(),
                            "video queue aborted, stopping consumer"
                        );
                        return;
                    }
                    GetResult::Empty => unreachable!("blocking get never returns Empty"),
                }
            }
        }
    }

    /// `true` iff `err` was a publish I/O stall past `publish_timeout`, in which case the
    /// embedder's timeout notification fires exactly once and the loop exits.
    fn report_timeout(err: &PublisherError, listener: &dyn PublishEventListener) -> bool {
        if matches!(err, PublisherError::Rtmp(RtmpError::Timeout)) {
            warn!("publish I/O stalled past the timeout, aborting session");
            listener.on_publish_timeout();
            true
        } else {
            false
        }
    }

    /// Cancels an in-flight connect if one is running, otherwise stops the run loop: aborts
    /// both packet queues so a blocking `get` wakes instead of waiting for the next packet
    /// that may never arrive, then joins the worker thread so `stop()` doesn't return until
    /// the publish session has actually torn down.
    pub fn stop(&self) {
        {
            let connecting = self.connecting.lock().unwrap();
            if *connecting {
                self.cancel_requested.store(true, Ordering::SeqCst);
                warn!("stop() called while still connecting; will cancel once connect returns");
            } else {
                self.stopped.store(true, Ordering::SeqCst);
            }
        }
        self.video_pool.abort_video_queue();
        self.video_pool.abort_audio_queue();
        self.audio_pool.abort();

        if let Some(handle) = self.join_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

/// `true` iff audio should be pulled and written next, given each stream's last-written
/// presentation time in seconds: audio runs ahead whenever it still trails video.
fn should_write_audio_next(last_audio_pts_secs: f64, last_video_pts_secs: f64) -> bool {
    last_audio_pts_secs < last_video_pts_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaving_prefers_video_first_when_both_clocks_are_at_zero() {
        assert!(!should_write_audio_next(0.0, 0.0));
    }

    #[test]
    fn interleaving_pulls_whichever_stream_trails() {
        assert!(should_write_audio_next(1.0, 2.0));
        assert!(!should_write_audio_next(2.0, 1.0));
    }

    #[test]
    fn interleaving_alternates_as_both_clocks_advance() {
        let mut last_audio = 0.0;
        let mut last_video = 0.0;
        let mut audio_turns = 0;
        let mut video_turns = 0;
        for _ in 0..20 {
            if should_write_audio_next(last_audio, last_video) {
                audio_turns += 1;
                last_audio += 0.023; // ~1024 samples at 44.1kHz
            } else {
                video_turns += 1;
                last_video += 0.033; // ~30fps
            }
        }
        assert!(audio_turns > 0);
        assert!(video_turns > 0);
    }
}
