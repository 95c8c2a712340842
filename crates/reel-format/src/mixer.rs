//! 混音器绑定.
//!
//! 调度器在开始播放时把每条音频轨道的流交给混音器, 停止、定位或回退时解除绑定.
//! 混音器本身由嵌入方提供.

use std::sync::atomic::{AtomicU32, Ordering};

use reel_codec::AudioStreamHandle;

/// 声音类型, 原样传给混音器 (用于分组音量控制)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoundType {
    /// 普通声音
    #[default]
    Plain,
    /// 音乐
    Music,
    /// 语音
    Speech,
    /// 音效
    Sfx,
}

/// 混音器中的声音句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u32);

/// 混音器接口
pub trait Mixer: Send {
    /// 开始播放一个音频流
    fn play_stream(&mut self, sound_type: SoundType, stream: AudioStreamHandle) -> SoundHandle;

    /// 停止并释放一个声音
    fn stop_handle(&mut self, handle: SoundHandle);

    /// 暂停或恢复一个声音
    fn pause_handle(&mut self, handle: SoundHandle, paused: bool);
}

/// 丢弃所有声音的混音器 (无头解码使用)
#[derive(Debug, Default)]
pub struct NullMixer {
    next_handle: AtomicU32,
}

impl NullMixer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Mixer for NullMixer {
    fn play_stream(&mut self, _sound_type: SoundType, _stream: AudioStreamHandle) -> SoundHandle {
        SoundHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    fn stop_handle(&mut self, _handle: SoundHandle) {}

    fn pause_handle(&mut self, _handle: SoundHandle, _paused: bool) {}
}
