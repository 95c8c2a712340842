//! AVI 定位与回退集成测试.
//!
//! 差分编解码器的画面值只有在从最近关键帧起依次解码时才正确,
//! 因此可以直接从画面判断定位是否回到了关键帧.

mod common;

use common::{AviBuilder, IndexMode, MixerEvent, open, surface_value};
use reel::core::{ReelError, Timestamp};
use reel::format::{SoundType, VideoDecoderConfig};

fn next_value(decoder: &mut reel::format::VideoDecoder) -> Option<u8> {
    decoder.decode_next_frame().map(surface_value)
}

// ============================================================
// 视频定位
// ============================================================

#[test]
fn test_定位_从最近关键帧解码() {
    let data = AviBuilder::new(100).keyframes(&[0, 30, 60]).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());
    assert!(decoder.is_seekable());

    decoder.seek(Timestamp::from_millis(4_500)).expect("定位失败");
    assert_eq!(decoder.get_current_frame(), 44);
    assert_eq!(decoder.get_time().to_millis(), 4_500);
    assert_eq!(next_value(&mut decoder), Some(45));
    assert_eq!(decoder.get_current_frame(), 45);
    assert_eq!(next_value(&mut decoder), Some(46));
}

#[test]
fn test_定位_帧内时间向下取整() {
    let data = AviBuilder::new(100).keyframes(&[0, 30, 60]).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    decoder.seek(Timestamp::from_millis(6_099)).expect("定位失败");
    assert_eq!(decoder.get_current_frame(), 59);
    assert_eq!(next_value(&mut decoder), Some(60));
}

#[test]
fn test_定位_重复定位结果一致() {
    let data = AviBuilder::new(100).keyframes(&[0, 30, 60]).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());
    let target = Timestamp::from_millis(7_200);

    decoder.seek(target).expect("定位失败");
    decoder.seek(target).expect("定位失败");
    assert_eq!(decoder.get_current_frame(), 71);
    assert_eq!(next_value(&mut decoder), Some(72));

    // 先播放一段再定位回同一位置
    for _ in 0..10 {
        decoder.decode_next_frame();
    }
    decoder.seek(target).expect("定位失败");
    assert_eq!(next_value(&mut decoder), Some(72));
}

#[test]
fn test_定位_向后定位() {
    let data = AviBuilder::new(100).keyframes(&[0, 30, 60]).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    decoder.seek(Timestamp::from_millis(8_000)).expect("定位失败");
    assert_eq!(next_value(&mut decoder), Some(80));
    decoder.seek(Timestamp::from_millis(1_000)).expect("定位失败");
    assert_eq!(next_value(&mut decoder), Some(10));
}

#[test]
fn test_定位_零点等同回退() {
    let data = AviBuilder::new(40).keyframes(&[0, 20]).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    for _ in 0..25 {
        decoder.decode_next_frame();
    }
    decoder.seek(Timestamp::ZERO).expect("定位失败");
    assert_eq!(decoder.get_current_frame(), -1);
    let after_seek: Vec<u8> = (0..5).filter_map(|_| next_value(&mut decoder)).collect();

    for _ in 0..10 {
        decoder.decode_next_frame();
    }
    decoder.rewind().expect("回退失败");
    assert_eq!(decoder.get_current_frame(), -1);
    assert_eq!(decoder.get_time().to_millis(), 0);
    let after_rewind: Vec<u8> = (0..5).filter_map(|_| next_value(&mut decoder)).collect();

    assert_eq!(after_seek, vec![0, 1, 2, 3, 4]);
    assert_eq!(after_seek, after_rewind);
}

#[test]
fn test_定位_到结尾() {
    let data = AviBuilder::new(50).pcm_audio(2, 22050, 16, true).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    let duration = decoder.get_duration();
    assert_eq!(duration.to_millis(), 5_000);
    decoder.seek(duration).expect("定位失败");
    assert_eq!(decoder.get_current_frame(), 49);
    assert!(decoder.end_of_video());
    assert!(decoder.decode_next_frame().is_none());
    let track = decoder.get_audio_track(0).expect("应有音频轨道");
    assert!(track.end_of_data());
    assert_eq!(track.buffered_millis(), 0);
}

#[test]
fn test_定位_超出时长报错() {
    let data = AviBuilder::new(50).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    let result = decoder.seek(Timestamp::from_millis(5_001));
    assert!(matches!(result, Err(ReelError::InvalidArgument(_))));
}

#[test]
fn test_定位_无索引不可定位() {
    let data = AviBuilder::new(20).index(IndexMode::None).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    assert!(!decoder.is_seekable());
    assert!(matches!(
        decoder.seek(Timestamp::from_millis(500)),
        Err(ReelError::NotSeekable)
    ));
    // 回退只要求字节源可定位
    for _ in 0..5 {
        decoder.decode_next_frame();
    }
    decoder.rewind().expect("回退失败");
    assert_eq!(next_value(&mut decoder), Some(0));
}

#[test]
fn test_定位_绝对偏移索引() {
    let data = AviBuilder::new(100)
        .keyframes(&[0, 30, 60])
        .index(IndexMode::Absolute)
        .build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    decoder.seek(Timestamp::from_millis(4_500)).expect("定位失败");
    assert_eq!(next_value(&mut decoder), Some(45));
}

// ============================================================
// 调色板
// ============================================================

#[test]
fn test_定位_重放调色板变更() {
    let red = [255, 0, 0];
    let data = AviBuilder::new(100)
        .keyframes(&[0, 30, 60])
        .palette_change(50, 7, &[red])
        .build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    decoder.seek(Timestamp::from_millis(7_000)).expect("定位失败");
    assert_eq!(decoder.get_palette().map(|p| p.get(7)), Some(red));

    // 定位到变更之前: 回到初始调色板
    decoder.seek(Timestamp::from_millis(4_000)).expect("定位失败");
    assert!(decoder.has_dirty_palette());
    assert_eq!(decoder.get_palette().map(|p| p.get(7)), Some([7, 14, 21]));
    assert_eq!(next_value(&mut decoder), Some(40));
}

// ============================================================
// 音频
// ============================================================

#[test]
fn test_定位_音频无关键帧标志时按块定位() {
    let data = AviBuilder::new(100)
        .keyframes(&[0, 30, 60])
        .pcm_audio(1, 8000, 16, false)
        .build();
    let (mut decoder, _clock, mixer) = open(data, &VideoDecoderConfig::default());

    decoder.seek(Timestamp::from_millis(4_500)).expect("定位失败");
    let track = decoder.get_audio_track(0).expect("应有音频轨道");
    assert_eq!(track.cur_chunk(), 45);
    // 只排入第 45 块
    assert_eq!(track.buffered_millis(), 100);

    decoder.start();
    let handle = mixer.active_handles()[0];
    let samples = mixer.read_samples(handle, 800);
    assert_eq!(samples.len(), 800);
    assert!(samples.iter().all(|&s| s == 45));
}

#[test]
fn test_定位_音频丢弃目标之前的样本() {
    let data = AviBuilder::new(100).pcm_audio(1, 8000, 16, true).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    decoder.seek(Timestamp::from_millis(4_550)).expect("定位失败");
    let track = decoder.get_audio_track(0).expect("应有音频轨道");
    // 第 45 块 800 个样本中前 400 个被丢弃
    assert_eq!(track.buffered_millis(), 50);
}

#[test]
fn test_定位_音频提前量恢复() {
    let data = AviBuilder::new(100).pcm_audio(2, 22050, 16, true).build();
    let (mut decoder, _clock, _mixer) = open(data, &VideoDecoderConfig::default());

    decoder.seek(Timestamp::from_millis(3_000)).expect("定位失败");
    decoder.decode_next_frame();
    assert_eq!(decoder.get_current_frame(), 30);
    let track = decoder.get_audio_track(0).expect("应有音频轨道");
    assert!(track.cur_chunk() >= 35, "音频只排到第 {} 块", track.cur_chunk());
    assert!(!track.end_of_data());
}

#[test]
fn test_定位_播放中重新绑定音频() {
    let data = AviBuilder::new(50).pcm_audio(2, 22050, 16, true).build();
    let (mut decoder, clock, mixer) = open(data, &VideoDecoderConfig::default());

    decoder.start();
    let first = mixer.active_handles()[0];
    clock.advance(700);
    decoder.seek(Timestamp::from_millis(2_000)).expect("定位失败");
    assert_eq!(decoder.get_time().to_millis(), 2_000);

    let second = mixer.active_handles()[0];
    assert_ne!(first, second);
    assert_eq!(
        mixer.events(),
        vec![
            MixerEvent::Play(first, SoundType::Plain),
            MixerEvent::Stop(first),
            MixerEvent::Play(second, SoundType::Plain),
        ]
    );

    clock.advance(100);
    assert_eq!(decoder.get_time().to_millis(), 2_100);
}

#[test]
fn test_定位_停止时不绑定音频() {
    let data = AviBuilder::new(50).pcm_audio(2, 22050, 16, true).build();
    let (mut decoder, _clock, mixer) = open(data, &VideoDecoderConfig::default());

    decoder.seek(Timestamp::from_millis(1_000)).expect("定位失败");
    decoder.rewind().expect("回退失败");
    assert!(mixer.events().is_empty());
    let track = decoder.get_audio_track(0).expect("应有音频轨道");
    assert_eq!(track.cur_chunk(), 0);
    assert_eq!(track.buffered_millis(), 0);
}
