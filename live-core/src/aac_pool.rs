use crate::{
    packet::AudioPacket,
    queue::{GetResult, PacketQueue},
};

/// FIFO of encoded AAC frames sitting between the encoder worker and the publisher.
/// Unlike `LivePacketPool`'s video side, there is no drop policy here: AAC frames are
/// small and the encoder is expected to keep pace, so backpressure is left to the
/// producer blocking on `put` capacity upstream rather than dropping here.
pub struct AacPacketPool {
    queue: PacketQueue<AudioPacket>,
}

impl AacPacketPool {
    pub fn new() -> Self {
        Self {
            queue: PacketQueue::new("aac encoded frame queue"),
        }
    }

    pub fn push(&self, pkt: AudioPacket) {
        self.queue.put(pkt);
    }

    pub fn get(&self, block: bool) -> GetResult<AudioPacket> {
        self.queue.get(block)
    }

    pub fn size(&self) -> usize {
        self.queue.size()
    }

    pub fn abort(&self) {
        self.queue.abort();
    }

    pub fn flush(&self) {
        self.queue.flush();
    }
}

impl Default for AacPacketPool {
    fn default() -> Self {
        Self::new()
    }
}
