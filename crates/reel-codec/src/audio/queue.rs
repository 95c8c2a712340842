//! 包队列音频流.
//!
//! 生产者 (容器解析线程) 与消费者 (混音器) 共享同一个样本队列.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;

use super::{AudioStream, PacketDecoder};

/// 共享的样本队列
#[derive(Default)]
struct QueueState {
    /// 已解码的交错样本
    samples: VecDeque<i16>,
    /// 生产者已声明不再排入数据
    finished: bool,
}

/// 加锁, 锁中毒时继续使用内部数据
fn lock(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// 包队列音频流 (生产者一侧)
///
/// 没有解码器时为空流: 排入的数据被丢弃, 读取永远得到静音.
pub struct PacketizedAudioStream {
    /// 包解码器
    decoder: Option<Box<dyn PacketDecoder>>,
    /// 共享队列
    state: Arc<Mutex<QueueState>>,
    /// 声道数
    channels: u16,
    /// 采样率
    rate: u32,
    /// 解码缓冲, 复用以减少分配
    scratch: Vec<i16>,
}

impl PacketizedAudioStream {
    /// 创建带解码器的包队列流
    pub fn new(decoder: Box<dyn PacketDecoder>, channels: u16, rate: u32) -> Self {
        Self {
            decoder: Some(decoder),
            state: Arc::new(Mutex::new(QueueState::default())),
            channels,
            rate,
            scratch: Vec::new(),
        }
    }

    /// 创建空流 (不支持的格式使用)
    pub fn null(channels: u16, rate: u32) -> Self {
        Self {
            decoder: None,
            state: Arc::new(Mutex::new(QueueState::default())),
            channels,
            rate,
            scratch: Vec::new(),
        }
    }

    /// 是否为空流
    pub fn is_null(&self) -> bool {
        self.decoder.is_none()
    }

    /// 排入一个压缩数据包
    ///
    /// 解码失败的包被丢弃并记录警告, 不影响后续数据.
    pub fn queue_packet(&mut self, data: &[u8]) {
        let Some(decoder) = self.decoder.as_mut() else {
            return;
        };
        self.scratch.clear();
        if let Err(e) = decoder.decode(data, &mut self.scratch) {
            warn!("音频包解码失败 ({}): {}", decoder.name(), e);
            return;
        }
        lock(&self.state).samples.extend(self.scratch.iter().copied());
    }

    /// 声明不再有新数据
    pub fn finish(&mut self) {
        lock(&self.state).finished = true;
    }

    /// 是否已声明结束
    pub fn is_finished(&self) -> bool {
        lock(&self.state).finished
    }

    /// 队列中尚未被读取的采样帧数 (每帧含全部声道)
    pub fn buffered_frames(&self) -> usize {
        lock(&self.state).samples.len() / usize::from(self.channels.max(1))
    }

    /// 队列中尚未被读取的时长 (毫秒)
    pub fn buffered_millis(&self) -> u64 {
        if self.rate == 0 {
            return 0;
        }
        self.buffered_frames() as u64 * 1000 / u64::from(self.rate)
    }

    /// 声道数
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// 采样率
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// 获取消费者句柄 (交给混音器)
    pub fn handle(&self) -> AudioStreamHandle {
        AudioStreamHandle {
            state: Arc::clone(&self.state),
            channels: self.channels,
            rate: self.rate,
        }
    }
}

/// 包队列音频流的消费者句柄
///
/// 可克隆; 所有克隆共享同一个读取位置.
#[derive(Clone)]
pub struct AudioStreamHandle {
    /// 共享队列
    state: Arc<Mutex<QueueState>>,
    /// 声道数
    channels: u16,
    /// 采样率
    rate: u32,
}

impl AudioStreamHandle {
    /// 当前可读的样本数 (所有声道合计)
    pub fn available_samples(&self) -> usize {
        lock(&self.state).samples.len()
    }
}

impl AudioStream for AudioStreamHandle {
    fn read_buffer(&mut self, buffer: &mut [i16]) -> usize {
        let mut state = lock(&self.state);
        let n = buffer.len().min(state.samples.len());
        for (dst, src) in buffer.iter_mut().zip(state.samples.drain(..n)) {
            *dst = src;
        }
        n
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn end_of_data(&self) -> bool {
        lock(&self.state).samples.is_empty()
    }

    fn end_of_stream(&self) -> bool {
        let state = lock(&self.state);
        state.finished && state.samples.is_empty()
    }
}

impl std::fmt::Debug for AudioStreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStreamHandle")
            .field("channels", &self.channels)
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}
