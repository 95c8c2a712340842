//! # Reel
//!
//! 纯 Rust 实现的 AVI 视频回放框架.
//!
//! Reel 把一个 AVI 文件变成按时间驱动的画面序列与可拉取的 PCM 音频流:
//! - **容器**: RIFF/AVI 解析, idx1 索引, 按需扫描 movi
//! - **编解码**: 可扩展的视频编解码器注册表, PCM / MS ADPCM / IMA ADPCM / DK3 音频
//! - **调度**: 墙上时钟驱动的帧节奏, 暂停、定位、回退, 混音器绑定
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use reel::format::{NullMixer, SystemClock, VideoDecoder, VideoDecoderConfig};
//!
//! let registry = std::sync::Arc::new(reel::default_codec_registry());
//! let mut decoder = VideoDecoder::avi(
//!     &VideoDecoderConfig::default(),
//!     registry,
//!     Box::new(SystemClock::new()),
//!     Box::new(NullMixer::new()),
//! );
//! decoder.load_file("intro.avi").unwrap();
//! println!("共 {} 帧, 时长 {}", decoder.get_frame_count(), decoder.get_duration());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `reel-core` | 错误类型、有理数、时间戳、像素格式 |
//! | `reel-codec` | 画面与调色板, 视频编解码器, 音频包流与解码器 |
//! | `reel-format` | 字节源, AVI 解封装, 轨道, 回放调度 |

pub mod logging;

/// 核心类型与工具
pub use reel_core as core;

/// 编解码器框架
pub use reel_codec as codec;

/// 容器与回放调度
pub use reel_format as format;

/// 获取 Reel 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置编解码器的注册表
pub fn default_codec_registry() -> reel_codec::CodecRegistry {
    let mut registry = reel_codec::CodecRegistry::new();
    reel_codec::register_all(&mut registry);
    registry
}
