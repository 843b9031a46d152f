use std::{path::PathBuf, sync::Arc};

use live_core::{
    AacPacketPool, AudioEncoderAdapter, AudioEncoderAdapterOptions, ConsumerThread,
    ConsumerThreadOptions, InitializableThread, LivePacketPool, PublishEventListener,
};
use live_publish::{config, error::AppError, logger, source};
use rtmp::RtmpClientConfig;
use tracing::{info, warn};

/// Logs the lifecycle notifications the embedder would otherwise wire to UI state.
struct TracingListener;

impl PublishEventListener for TracingListener {
    fn on_connect_success(&self) {
        info!("RTMP publish session connected");
    }

    fn on_connect_failed(&self, reason: &str) {
        warn!(reason, "RTMP publish session failed to connect");
    }

    fn on_publish_timeout(&self) {
        warn!("RTMP publish stalled past the configured timeout");
    }

    fn on_video_packet_dropped(&self) {
        warn!("video queue congested, dropped a GOP to catch up");
    }
}

fn main() -> Result<(), AppError> {
    let config = config::read_config();
    logger::init_logger(config.logger.clone());

    info!(url = %config.rtmp.url, "starting live publish pipeline");

    let listener = Arc::new(TracingListener);
    let video_pool = Arc::new(LivePacketPool::with_listener(
        config.audio.sample_rate,
        config.audio.channels,
        listener.clone(),
    ));
    let aac_pool = Arc::new(AacPacketPool::new());

    let audio_config = AudioEncoderAdapter::spawn(
        "main",
        AudioEncoderAdapterOptions {
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
            source: Arc::clone(&video_pool),
            sink: Arc::clone(&aac_pool),
        },
    )
    .map_err(|e| AppError::Config(format!("failed to start audio encoder: {e}")))?;

    let consumer = ConsumerThread::spawn(ConsumerThreadOptions {
        rtmp_config: RtmpClientConfig {
            url: config.rtmp.url.clone(),
            connect_timeout: config.rtmp.connect_timeout(),
            publish_timeout: config.rtmp.publish_timeout(),
        },
        audio_extradata: audio_config.extradata,
        video_pool: Arc::clone(&video_pool),
        audio_pool: Arc::clone(&aac_pool),
        listener,
    });

    feed_from_demo_input(&video_pool)?;

    let shutdown = Arc::new(std::sync::atomic::AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .map_err(AppError::Io)?;

    while !shutdown.load(std::sync::atomic::Ordering::Relaxed)
        && (video_pool.video_queue_size() > 0 || video_pool.audio_queue_size() > 0)
    {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    info!("shutting down live publish pipeline");
    consumer.stop();

    Ok(())
}

/// Demo-only input path: if `LIVE_PUBLISH_H264`/`LIVE_PUBLISH_PCM` point at raw
/// elementary streams, feed them through the pool once at startup. Real deployments
/// wire a capture callback to `LivePacketPool::push_video`/`push_audio` instead.
fn feed_from_demo_input(pool: &LivePacketPool) -> Result<(), AppError> {
    if let Ok(h264_path) = std::env::var("LIVE_PUBLISH_H264") {
        for pkt in source::read_h264_access_units(&PathBuf::from(h264_path))? {
            pool.push_video(pkt);
        }
    }
    if let Ok(pcm_path) = std::env::var("LIVE_PUBLISH_PCM") {
        for pkt in source::read_pcm_chunks(&PathBuf::from(pcm_path), 4096)? {
            pool.push_audio(pkt);
        }
    }
    Ok(())
}
