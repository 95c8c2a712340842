//! 统一错误类型定义.
//!
//! 所有 Reel crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Reel 框架统一错误类型
#[derive(Debug, Error)]
pub enum ReelError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作或流类型
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 编解码器错误
    #[error("编解码器错误: {0}")]
    Codec(String),

    /// 容器格式错误 (缺少必需的块等)
    #[error("格式错误: {0}")]
    Format(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达数据末尾
    #[error("已到达数据末尾")]
    Eof,

    /// 未找到指定的编解码器
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),

    /// 未找到指定的流
    #[error("未找到流: 索引 {0}")]
    StreamNotFound(usize),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 尚未加载任何视频
    #[error("尚未加载视频")]
    NotLoaded,

    /// 当前视频不支持定位 (例如缺少索引)
    #[error("当前视频不支持 seek")]
    NotSeekable,
}

/// Reel 框架统一 Result 类型
pub type ReelResult<T> = Result<T, ReelError>;
