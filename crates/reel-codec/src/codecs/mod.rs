//! 内置视频编解码器.

pub mod raw;

use crate::registry::CodecRegistry;

/// 注册所有内置视频编解码器
pub fn register_all_video_codecs(registry: &mut CodecRegistry) {
    registry.register_video_codec([0, 0, 0, 0], "rawbitmap", raw::RawBitmapCodec::create);
    registry.register_video_codec(*b"DIB ", "rawbitmap", raw::RawBitmapCodec::create);
    registry.register_video_codec(*b"RAW ", "rawbitmap", raw::RawBitmapCodec::create);
}
