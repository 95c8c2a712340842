//! # reel-format
//!
//! Reel 视频回放框架容器与调度库.
//!
//! - [`io::IoContext`]: 带缓冲的只读字节源 (文件 / 内存 / 任意 `Read + Seek`)
//! - [`avi::AviDemuxer`]: AVI 解封装, 按需扫描 movi 并维持音频提前量
//! - [`VideoDecoder`]: 以墙上时钟驱动容器, 并把音频流绑定到混音器
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use reel_codec::CodecRegistry;
//! use reel_format::{NullMixer, SystemClock, VideoDecoder, VideoDecoderConfig};
//!
//! let mut registry = CodecRegistry::new();
//! reel_codec::register_all(&mut registry);
//! let mut decoder = VideoDecoder::avi(
//!     &VideoDecoderConfig::default(),
//!     Arc::new(registry),
//!     Box::new(SystemClock::new()),
//!     Box::new(NullMixer::new()),
//! );
//! decoder.load_file("movie.avi").unwrap();
//! decoder.start();
//! while !decoder.end_of_video() {
//!     if decoder.needs_update() {
//!         if let Some(surface) = decoder.decode_next_frame() {
//!             println!("{}x{}", surface.width, surface.height);
//!         }
//!     }
//! }
//! ```

pub mod avi;
pub mod clock;
pub mod container;
pub mod io;
pub mod mixer;
pub mod track;
pub mod video_decoder;

// 重导出常用类型
pub use avi::AviDemuxer;
pub use clock::{ManualClock, SystemClock, WallClock};
pub use container::MediaContainer;
pub use io::IoContext;
pub use mixer::{Mixer, NullMixer, SoundHandle, SoundType};
pub use track::{AudioStreamFactory, AudioTrack, VideoTrack};
pub use video_decoder::{VideoDecoder, VideoDecoderConfig};
