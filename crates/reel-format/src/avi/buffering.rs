//! 音频提前量策略.
//!
//! 解封装器在每次拉取视频帧之后为每条音频轨道补充数据, 直到音频时间领先
//! 视频当前帧时间 [`AUDIO_LEAD_MS`] 毫秒, 以免混音线程在视频解码较慢时断流.

use reel_core::{Rational, Timestamp};

/// 音频需要领先视频的时长 (毫秒)
pub const AUDIO_LEAD_MS: i64 = 500;

/// 视频轨道的时钟快照
#[derive(Debug, Clone, Copy)]
pub struct VideoClock {
    /// 当前帧号 (-1 表示尚未解码)
    pub cur_frame: i64,
    /// 帧率 (rate / scale)
    pub frame_rate: Rational,
    /// 视频是否已到结尾
    pub ended: bool,
}

/// 音频轨道的时钟快照
#[derive(Debug, Clone, Copy)]
pub struct AudioClock {
    /// 已排入的块数
    pub cur_chunk: i64,
    /// 音频流自身的速率 (rate / scale)
    pub unit_rate: Rational,
    /// strh 中的样本大小, 0 表示可变码率
    pub sample_size: u32,
}

impl AudioClock {
    /// 块计数对应的速率: 可变码率用自身速率, 固定码率随视频帧前进
    pub fn chunk_rate(&self, video: &VideoClock) -> Rational {
        if self.sample_size == 0 {
            self.unit_rate
        } else {
            video.frame_rate
        }
    }
}

/// 是否应继续为该音频轨道排入数据
pub fn should_queue_audio(video: &VideoClock, audio: &AudioClock) -> bool {
    // 视频已结束: 把剩余音频全部读完
    if video.ended {
        return true;
    }

    let video_time =
        Timestamp::from_frames(video.cur_frame, video.frame_rate).add_millis(AUDIO_LEAD_MS);
    let audio_time = Timestamp::from_frames(audio.cur_chunk, audio.chunk_rate(video));
    audio_time < video_time
}
