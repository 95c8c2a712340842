//! # reel-core
//!
//! Reel 视频回放框架核心库, 提供基础类型定义、错误处理和工具函数.
//!
//! 容器解析、编解码与回放调度共用的底层类型都定义在这里.

pub mod crc;
pub mod error;
pub mod media_type;
pub mod pixel_format;
pub mod rational;
pub mod timestamp;

// 重导出常用类型
pub use error::{ReelError, ReelResult};
pub use media_type::MediaType;
pub use pixel_format::PixelFormat;
pub use rational::Rational;
pub use timestamp::Timestamp;
