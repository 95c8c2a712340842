//! AVI (Audio Video Interleave) 解封装器.
//!
//! AVI 是 RIFF 格式, 结构如下:
//! ```text
//! RIFF 'AVI '
//!   LIST 'hdrl'
//!     avih (主头)
//!     LIST 'strl' (每流一个)
//!       strh (流头)
//!       strf (流格式)
//!   LIST 'movi' (数据块, 回放时按需扫描)
//!     ##dc / ##db (视频帧)
//!     ##wb (音频块)
//!     ##pc (调色板变更)
//!   idx1 (可选旧式索引, 定位依赖它)
//! ```
//!
//! 每条轨道各自维护一个块搜索偏移: 拉取数据时从该偏移开始扫描 movi,
//! 跳过其他流的块, 直到取得本轨道的下一块.

pub mod buffering;
pub mod chunk;
pub mod header;
pub mod index;

use std::sync::Arc;

use bytes::Bytes;
use log::{debug, info, warn};
use reel_codec::{CodecRegistry, fourcc_to_string};
use reel_core::{Rational, ReelError, ReelResult, Timestamp};

use crate::container::MediaContainer;
use crate::io::IoContext;
use crate::mixer::SoundType;
use crate::track::{AudioStreamFactory, AudioTrack, VideoTrack};
use crate::video_decoder::VideoDecoderConfig;

use buffering::{AudioClock, VideoClock, should_queue_audio};
use chunk::ChunkKind;
use header::MainHeader;
use index::IndexEntry;

/// 轨道的拉取状态
#[derive(Debug, Clone, Copy)]
struct TrackStatus {
    /// 流编号 (movi 块标签前两位十六进制)
    stream_index: u32,
    /// 下次扫描的起始偏移
    chunk_search_offset: u64,
}

impl TrackStatus {
    fn new(stream_index: u32) -> Self {
        Self {
            stream_index,
            chunk_search_offset: 0,
        }
    }
}

/// 定位时在索引中找到的位置
#[derive(Debug, Clone)]
struct SeekPoint {
    /// 目标之前 (含) 最近的关键帧条目
    key: usize,
    /// 目标条目
    target: usize,
    /// 目标之前的调色板变更条目
    palettes: Vec<IndexEntry>,
}

/// AVI 解封装器
pub struct AviDemuxer {
    /// 字节源, 加载成功后持有
    io: Option<IoContext>,
    /// 编解码器注册表
    registry: Arc<CodecRegistry>,
    /// 交给音频轨道的声音类型
    sound_type: SoundType,
    /// 帧率覆盖 (替换视频 strh 的 rate/scale)
    frame_rate_override: Option<Rational>,
    /// 容器特定的音频解码器工厂
    audio_factory: Option<AudioStreamFactory>,
    /// avih 主头
    header: MainHeader,
    /// 流数量 (含被跳过的未知流)
    stream_count: u32,
    /// movi 负载起始位置 ('movi' 四字节之后)
    movi_start: u64,
    /// movi 负载结束位置
    movi_end: u64,
    /// idx1 索引 (偏移已规范化为绝对偏移)
    index: Vec<IndexEntry>,
    /// idx1 原本是否为绝对偏移
    index_absolute: Option<bool>,
    /// 唯一的视频轨道
    video: Option<(TrackStatus, VideoTrack)>,
    /// 音频轨道
    audio: Vec<(TrackStatus, AudioTrack)>,
}

impl AviDemuxer {
    /// 创建解封装器
    pub fn new(registry: Arc<CodecRegistry>, config: &VideoDecoderConfig) -> Self {
        let frame_rate_override = config.frame_rate_override.filter(|rate| {
            let usable = rate.is_positive();
            if !usable {
                debug!("忽略无效的帧率覆盖 {rate}");
            }
            usable
        });
        Self {
            io: None,
            registry,
            sound_type: config.sound_type,
            frame_rate_override,
            audio_factory: None,
            header: MainHeader::default(),
            stream_count: 0,
            movi_start: 0,
            movi_end: 0,
            index: Vec::new(),
            index_absolute: None,
            video: None,
            audio: Vec::new(),
        }
    }

    /// 创建解封装器 (装箱为容器 trait 对象)
    pub fn create(
        registry: Arc<CodecRegistry>,
        config: &VideoDecoderConfig,
    ) -> Box<dyn MediaContainer> {
        Box::new(Self::new(registry, config))
    }

    /// 设置容器特定的音频解码器工厂, 在下次 `load()` 时生效
    pub fn set_audio_stream_factory(&mut self, factory: AudioStreamFactory) {
        self.audio_factory = Some(factory);
    }

    /// avih 主头
    pub fn main_header(&self) -> &MainHeader {
        &self.header
    }

    /// hdrl 中声明的流数量 (含被跳过的流)
    pub fn stream_count(&self) -> u32 {
        self.stream_count
    }

    /// movi 负载范围 `[start, end)`
    pub fn movi_range(&self) -> (u64, u64) {
        (self.movi_start, self.movi_end)
    }

    /// 规范化后的索引
    pub fn index(&self) -> &[IndexEntry] {
        &self.index
    }

    /// idx1 原本是否为绝对偏移, 无索引时为 `None`
    pub fn index_is_absolute(&self) -> Option<bool> {
        self.index_absolute
    }

    /// 视频轨道的流编号
    pub fn video_stream_index(&self) -> Option<u32> {
        self.video.as_ref().map(|(status, _)| status.stream_index)
    }

    /// 第 `index` 条音频轨道的流编号
    pub fn audio_stream_index(&self, index: usize) -> Option<u32> {
        self.audio.get(index).map(|(status, _)| status.stream_index)
    }

    // ========================
    // 解析
    // ========================

    /// 读取块头 (标签, 大小); 字节源结束时返回 `None`
    fn read_chunk_header(io: &mut IoContext) -> ReelResult<Option<([u8; 4], u32)>> {
        let tag = match io.read_tag() {
            Ok(tag) => tag,
            Err(ReelError::Eof) => return Ok(None),
            Err(e) => return Err(e),
        };
        match io.read_u32_le() {
            Ok(size) => Ok(Some((tag, size))),
            Err(ReelError::Eof) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 读取块负载并跳过对齐字节
    fn read_chunk_payload(io: &mut IoContext, size: u32) -> ReelResult<Bytes> {
        let data = io.read_substream(size as usize)?;
        if size & 1 != 0 {
            io.skip(1)?;
        }
        Ok(data)
    }

    /// 解析整个文件头部
    fn parse(&mut self, io: &mut IoContext) -> ReelResult<()> {
        if io.read_tag()? != chunk::TAG_RIFF {
            return Err(ReelError::Format("不是有效的 RIFF 文件".into()));
        }
        let _riff_size = io.read_u32_le()?;
        if io.read_tag()? != chunk::TAG_AVI {
            return Err(ReelError::Format("不是有效的 AVI 文件".into()));
        }
        debug!("检测到 RIFF/AVI 文件");

        let mut found_hdrl = false;
        let mut found_movi = false;

        while let Some((tag, size)) = Self::read_chunk_header(io)? {
            if tag == chunk::TAG_LIST {
                let list_type = io.read_tag()?;
                let list_size = size.saturating_sub(4);
                debug!("顶层列表 '{}', size={}", fourcc_to_string(&list_type), list_size);
                match list_type {
                    chunk::TAG_HDRL => {
                        self.parse_hdrl(io, list_size)?;
                        found_hdrl = true;
                    }
                    chunk::TAG_MOVI => {
                        self.movi_start = io.position()?;
                        self.movi_end = self.movi_start + chunk::padded(list_size);
                        if let Some(total) = io.size() {
                            self.movi_end = self.movi_end.min(total);
                        }
                        found_movi = true;
                        io.skip(chunk::padded(list_size))?;
                    }
                    _ => io.skip(chunk::padded(list_size))?,
                }
                continue;
            }

            debug!("顶层块 '{}', size={}", fourcc_to_string(&tag), size);
            if tag == chunk::TAG_IDX1 && found_movi {
                match Self::read_chunk_payload(io, size) {
                    Ok(data) => {
                        let raw_first = data.get(8..12).map(|b| {
                            u64::from(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        });
                        self.index = index::parse_index(&data, self.movi_start)?;
                        self.index_absolute = raw_first.map(|offset| offset == self.movi_start);
                    }
                    Err(ReelError::Eof) => {
                        warn!("idx1 被截断, 忽略索引");
                        break;
                    }
                    Err(e) => return Err(e),
                }
            } else {
                io.skip(chunk::padded(size))?;
            }
        }

        if !found_hdrl {
            return Err(ReelError::Format("缺少 hdrl 列表".into()));
        }
        if !found_movi {
            return Err(ReelError::Format("缺少 movi 列表".into()));
        }
        if self.video.is_none() {
            return Err(ReelError::Format("没有视频轨道".into()));
        }
        Ok(())
    }

    /// 解析 hdrl 列表
    fn parse_hdrl(&mut self, io: &mut IoContext, list_size: u32) -> ReelResult<()> {
        let end = io.position()? + u64::from(list_size);

        while io.position()? + 8 <= end {
            let Some((tag, size)) = Self::read_chunk_header(io)? else {
                break;
            };
            match tag {
                chunk::TAG_AVIH => {
                    let data = Self::read_chunk_payload(io, size)?;
                    self.header = header::parse_main_header(&data)?;
                    debug!(
                        "avih: {} 帧, {} 个流, {}x{}",
                        self.header.total_frames,
                        self.header.streams,
                        self.header.width,
                        self.header.height
                    );
                }
                chunk::TAG_LIST => {
                    let list_type = io.read_tag()?;
                    let sub_size = size.saturating_sub(4);
                    if list_type == chunk::TAG_STRL {
                        self.parse_strl(io, sub_size)?;
                    } else {
                        debug!("跳过 hdrl 中的列表 '{}'", fourcc_to_string(&list_type));
                        io.skip(chunk::padded(sub_size))?;
                    }
                }
                _ => {
                    debug!("跳过 hdrl 中的块 '{}'", fourcc_to_string(&tag));
                    io.skip(chunk::padded(size))?;
                }
            }
        }

        let pos = io.position()?;
        if pos < end {
            io.skip(end - pos)?;
        }
        Ok(())
    }

    /// 解析一个 strl 列表并建立轨道
    fn parse_strl(&mut self, io: &mut IoContext, list_size: u32) -> ReelResult<()> {
        let end = io.position()? + u64::from(list_size);
        let stream_index = self.stream_count;
        self.stream_count += 1;

        let mut strh = None;
        let mut strf = None;
        while io.position()? + 8 <= end {
            let Some((tag, size)) = Self::read_chunk_header(io)? else {
                break;
            };
            match tag {
                chunk::TAG_STRH => strh = Some(Self::read_chunk_payload(io, size)?),
                chunk::TAG_STRF => strf = Some(Self::read_chunk_payload(io, size)?),
                _ => {
                    debug!("跳过 strl 中的块 '{}'", fourcc_to_string(&tag));
                    io.skip(chunk::padded(size))?;
                }
            }
        }
        let pos = io.position()?;
        if pos < end {
            io.skip(end - pos)?;
        }

        let Some(strh) = strh else {
            return Err(ReelError::Format(format!("流 {stream_index} 缺少 strh")));
        };
        let mut stream_header = header::parse_stream_header(&strh)?;
        let strf = strf.unwrap_or_default();

        match stream_header.stream_type {
            chunk::STREAM_VIDS => {
                if self.video.is_some() {
                    return Err(ReelError::Format("不支持多个视频轨道".into()));
                }
                let bitmap_info = header::parse_bitmap_info(&strf)?;
                if let Some(rate) = self.frame_rate_override {
                    debug!(
                        "视频帧率 {}/{} 被覆盖为 {}",
                        stream_header.rate, stream_header.scale, rate
                    );
                    stream_header.rate = rate.num.unsigned_abs();
                    stream_header.scale = rate.den.unsigned_abs();
                }
                let frame_count = if self.header.total_frames != 0 {
                    self.header.total_frames
                } else {
                    stream_header.length
                };
                debug!(
                    "流 {}: 视频 '{}', {}x{}, {} 位, {} 帧, 帧率 {}",
                    stream_index,
                    fourcc_to_string(&bitmap_info.compression),
                    bitmap_info.width,
                    bitmap_info.height,
                    bitmap_info.bit_count,
                    frame_count,
                    stream_header.unit_rate()
                );
                let track = VideoTrack::new(
                    stream_header,
                    bitmap_info,
                    frame_count,
                    self.registry.clone(),
                )?;
                self.video = Some((TrackStatus::new(stream_index), track));
            }
            chunk::STREAM_AUDS => {
                let wave_format = header::parse_wave_format(&strf)?;
                debug!(
                    "流 {}: 音频 格式=0x{:04X}, {} Hz, {} 声道, {} 位, sample_size={}",
                    stream_index,
                    wave_format.tag,
                    wave_format.samples_per_sec,
                    wave_format.channels,
                    wave_format.bits_per_sample,
                    stream_header.sample_size
                );
                let track = AudioTrack::new(
                    stream_header,
                    wave_format,
                    self.sound_type,
                    self.registry.clone(),
                    self.audio_factory,
                );
                self.audio.push((TrackStatus::new(stream_index), track));
            }
            chunk::STREAM_MIDS | chunk::STREAM_TXTS => {
                return Err(ReelError::Unsupported(format!(
                    "不支持的流类型 '{}'",
                    fourcc_to_string(&stream_header.stream_type)
                )));
            }
            other => {
                debug!("流 {}: 跳过未知类型 '{}'", stream_index, fourcc_to_string(&other));
            }
        }
        Ok(())
    }

    /// 加载结束时为 Truemotion 1 读取一帧, 以解码出的尺寸为准
    fn probe_truemotion_dimensions(&mut self) -> ReelResult<()> {
        let is_truemotion = self
            .video
            .as_ref()
            .is_some_and(|(_, track)| track.is_truemotion1());
        if !is_truemotion {
            return Ok(());
        }

        self.advance_video()?;
        if let Some((_, track)) = self.video.as_mut() {
            if let Some((width, height)) = track.surface().map(|s| (s.width, s.height)) {
                debug!(
                    "Truemotion 1: 容器尺寸 {}x{} 修正为 {}x{}",
                    track.width(),
                    track.height(),
                    width,
                    height
                );
                track.force_dimensions(width, height);
            }
        }
        self.rewind_intern()
    }

    /// 清空全部状态
    fn reset(&mut self) {
        self.io = None;
        self.header = MainHeader::default();
        self.stream_count = 0;
        self.movi_start = 0;
        self.movi_end = 0;
        self.index.clear();
        self.index_absolute = None;
        self.video = None;
        self.audio.clear();
    }

    // ========================
    // 拉取数据
    // ========================

    /// 从当前位置扫描 movi, 取得指定流的下一块
    ///
    /// 跳过 rec 列表头、JUNK、idx1 与其他流的块. 到达 movi 末尾或字节源提前结束时返回 `None`.
    fn next_stream_chunk(
        io: &mut IoContext,
        stream_index: u32,
        movi_end: u64,
    ) -> ReelResult<Option<([u8; 4], Bytes)>> {
        loop {
            if io.position()? + 8 >= movi_end {
                return Ok(None);
            }
            let Some((tag, size)) = Self::read_chunk_header(io)? else {
                return Ok(None);
            };

            match tag {
                chunk::TAG_LIST => {
                    let list_type = io.read_tag()?;
                    if list_type != chunk::TAG_REC {
                        debug!("movi 中出现 '{}' 列表, 跳过", fourcc_to_string(&list_type));
                        io.skip(chunk::padded(size.saturating_sub(4)))?;
                    }
                    continue;
                }
                chunk::TAG_JUNK | chunk::TAG_IDX1 => {
                    io.skip(chunk::padded(size))?;
                    continue;
                }
                _ => {}
            }

            if chunk::stream_index(&tag) != Some(stream_index) {
                io.skip(chunk::padded(size))?;
                continue;
            }

            let data = if size == 0 {
                Bytes::new()
            } else {
                match Self::read_chunk_payload(io, size) {
                    Ok(data) => data,
                    Err(ReelError::Eof) => {
                        debug!("块 '{}' 被截断", fourcc_to_string(&tag));
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                }
            };
            return Ok(Some((tag, data)));
        }
    }

    /// 为视频轨道读取一帧
    fn advance_video(&mut self) -> ReelResult<bool> {
        let movi_end = self.movi_end;
        let (Some(io), Some((status, track))) = (self.io.as_mut(), self.video.as_mut()) else {
            return Err(ReelError::NotLoaded);
        };

        if status.chunk_search_offset + 8 >= movi_end {
            track.force_track_end();
            return Ok(false);
        }

        io.seek_to(status.chunk_search_offset)?;
        loop {
            match Self::next_stream_chunk(io, status.stream_index, movi_end)? {
                None => {
                    track.force_track_end();
                    status.chunk_search_offset = movi_end;
                    return Ok(false);
                }
                Some((tag, data)) => {
                    if chunk::chunk_kind(&tag) == ChunkKind::PaletteChange {
                        track.apply_palette_change(&data);
                        continue;
                    }
                    track.decode_frame(&data);
                    break;
                }
            }
        }
        status.chunk_search_offset = io.position()?;
        Ok(true)
    }

    /// 视频轨道的时钟快照
    fn video_clock(&self) -> Option<VideoClock> {
        self.video.as_ref().map(|(_, track)| VideoClock {
            cur_frame: track.cur_frame(),
            frame_rate: track.frame_rate(),
            ended: track.end_of_track(),
        })
    }

    /// 音频轨道的时钟快照
    fn audio_clock(track: &AudioTrack) -> AudioClock {
        AudioClock {
            cur_chunk: track.cur_chunk(),
            unit_rate: track.unit_rate(),
            sample_size: track.header().sample_size,
        }
    }

    /// 为第 `i` 条音频轨道补充数据, 直到提前量足够
    fn advance_audio(&mut self, i: usize) -> ReelResult<()> {
        let movi_end = self.movi_end;
        let Some(video) = self.video_clock() else {
            return Ok(());
        };
        let (Some(io), Some((status, track))) = (self.io.as_mut(), self.audio.get_mut(i)) else {
            return Err(ReelError::NotLoaded);
        };
        if track.end_of_data() {
            return Ok(());
        }

        if status.chunk_search_offset + 8 >= movi_end {
            track.finish();
            return Ok(());
        }
        if !should_queue_audio(&video, &Self::audio_clock(track)) {
            return Ok(());
        }

        io.seek_to(status.chunk_search_offset)?;
        loop {
            match Self::next_stream_chunk(io, status.stream_index, movi_end)? {
                None => {
                    track.finish();
                    status.chunk_search_offset = movi_end;
                    return Ok(());
                }
                Some((tag, data)) => {
                    if chunk::chunk_kind(&tag) != ChunkKind::Audio {
                        return Err(ReelError::InvalidData(format!(
                            "音频流 {} 中出现非音频块 '{}'",
                            status.stream_index,
                            fourcc_to_string(&tag)
                        )));
                    }
                    track.queue_sound(&data);
                    if !should_queue_audio(&video, &Self::audio_clock(track)) {
                        break;
                    }
                }
            }
        }
        status.chunk_search_offset = io.position()?;
        Ok(())
    }

    // ========================
    // 定位
    // ========================

    /// 在索引中找到某流的第 `target_frame` 个非调色板条目及其之前最近的关键帧
    ///
    /// 流的第一个条目总是视为关键帧.
    fn find_seek_point(
        entries: &[IndexEntry],
        stream_index: u32,
        target_frame: i64,
    ) -> Option<SeekPoint> {
        let mut palettes = Vec::new();
        let mut key = None;
        let mut cur_frame = 0i64;

        for (i, entry) in entries.iter().enumerate() {
            if entry.is_list_marker() || entry.stream_index() != Some(stream_index) {
                continue;
            }
            if entry.kind() == ChunkKind::PaletteChange {
                palettes.push(*entry);
                continue;
            }
            if entry.is_keyframe() || cur_frame == 0 {
                key = Some(i);
            }
            if cur_frame == target_frame {
                return Some(SeekPoint {
                    key: key.unwrap_or(i),
                    target: i,
                    palettes,
                });
            }
            cur_frame += 1;
        }
        None
    }

    /// 读取索引条目指向的负载
    fn read_entry(io: &mut IoContext, entry: &IndexEntry) -> ReelResult<Bytes> {
        if entry.size == 0 {
            return Ok(Bytes::new());
        }
        io.seek_to(entry.data_offset())?;
        io.read_substream(entry.size as usize)
    }

    /// 把视频轨道定位到 `time`: 从关键帧解码到目标帧之前一帧
    fn seek_video_track(&mut self, time: Timestamp) -> ReelResult<()> {
        let movi_end = self.movi_end;
        let (Some(io), Some((status, track))) = (self.io.as_mut(), self.video.as_mut()) else {
            return Err(ReelError::NotLoaded);
        };

        let target_frame = time.frames_at(track.frame_rate());
        track.use_initial_palette();

        let Some(point) = Self::find_seek_point(&self.index, status.stream_index, target_frame)
        else {
            debug!("索引中没有视频第 {target_frame} 帧, 视为结束");
            track.force_track_end();
            status.chunk_search_offset = movi_end;
            return Ok(());
        };

        for entry in &point.palettes {
            let data = Self::read_entry(io, entry)?;
            track.apply_palette_change(&data);
        }

        for entry in &self.index[point.key..point.target] {
            if entry.is_list_marker()
                || entry.stream_index() != Some(status.stream_index)
                || entry.kind() == ChunkKind::PaletteChange
            {
                continue;
            }
            let data = Self::read_entry(io, entry)?;
            track.decode_frame(&data);
        }

        track.set_cur_frame(target_frame - 1);
        status.chunk_search_offset = self.index[point.target].offset;
        debug!(
            "视频定位到 {}: 关键帧条目 {}, 目标条目 {} (第 {} 帧)",
            time, point.key, point.target, target_frame
        );
        Ok(())
    }

    /// 把第 `i` 条音频轨道定位到 `time`: 重建音频流并排入关键块到目标块
    fn seek_audio_track(&mut self, i: usize, time: Timestamp) -> ReelResult<()> {
        let movi_end = self.movi_end;
        let video_rate = self
            .video
            .as_ref()
            .map(|(_, track)| track.frame_rate())
            .ok_or(ReelError::NotLoaded)?;
        let (Some(io), Some((status, track))) = (self.io.as_mut(), self.audio.get_mut(i)) else {
            return Err(ReelError::NotLoaded);
        };

        track.reset_stream();
        let rate = Self::audio_clock(track).chunk_rate(&VideoClock {
            cur_frame: 0,
            frame_rate: video_rate,
            ended: false,
        });
        let target_chunk = time.frames_at(rate);

        let Some(point) = Self::find_seek_point(&self.index, status.stream_index, target_chunk)
        else {
            debug!("索引中没有音频第 {target_chunk} 块, 音频轨道结束");
            track.finish();
            status.chunk_search_offset = movi_end;
            return Ok(());
        };
        if !point.palettes.is_empty() {
            warn!("音频流 {} 中出现调色板变更块", status.stream_index);
        }

        for entry in &self.index[point.key..=point.target] {
            if entry.is_list_marker()
                || entry.stream_index() != Some(status.stream_index)
                || entry.kind() == ChunkKind::PaletteChange
            {
                continue;
            }
            let data = Self::read_entry(io, entry)?;
            track.queue_sound(&data);
        }

        track.set_cur_chunk(target_chunk);
        status.chunk_search_offset = self
            .index
            .get(point.target + 1)
            .map_or(movi_end, |entry| entry.offset);
        track.skip_audio(time, Timestamp::from_frames(target_chunk, rate));
        debug!(
            "音频流 {} 定位到 {}: 第 {} 块",
            status.stream_index, time, target_chunk
        );
        Ok(())
    }
}

impl MediaContainer for AviDemuxer {
    fn name(&self) -> &str {
        "avi"
    }

    fn load(&mut self, mut io: IoContext) -> ReelResult<()> {
        self.reset();

        if let Err(e) = self.parse(&mut io) {
            self.reset();
            return Err(e);
        }

        if let Some((status, _)) = self.video.as_mut() {
            status.chunk_search_offset = self.movi_start;
        }
        for (status, _) in &mut self.audio {
            status.chunk_search_offset = self.movi_start;
        }
        self.io = Some(io);

        if let Err(e) = self.probe_truemotion_dimensions() {
            self.reset();
            return Err(e);
        }

        info!(
            "AVI 加载完成: {} 个音频轨道, movi=[{}, {}), {} 个索引条目",
            self.audio.len(),
            self.movi_start,
            self.movi_end,
            self.index.len()
        );
        Ok(())
    }

    fn close(&mut self) {
        self.reset();
    }

    fn is_loaded(&self) -> bool {
        self.io.is_some()
    }

    fn is_seekable(&self) -> bool {
        self.io.as_ref().is_some_and(IoContext::is_seekable) && !self.index.is_empty()
    }

    fn read_next_packet(&mut self) -> ReelResult<bool> {
        let decoded = self.advance_video()?;
        for i in 0..self.audio.len() {
            if let Err(e) = self.advance_audio(i) {
                warn!("音频轨道 {i} 读取失败: {e}, 结束该轨道");
                if let Some((_, track)) = self.audio.get_mut(i) {
                    track.finish();
                }
            }
        }
        Ok(decoded)
    }

    fn video_track(&self) -> Option<&VideoTrack> {
        self.video.as_ref().map(|(_, track)| track)
    }

    fn video_track_mut(&mut self) -> Option<&mut VideoTrack> {
        self.video.as_mut().map(|(_, track)| track)
    }

    fn audio_track_count(&self) -> usize {
        self.audio.len()
    }

    fn audio_track(&self, index: usize) -> Option<&AudioTrack> {
        self.audio.get(index).map(|(_, track)| track)
    }

    fn seek_intern(&mut self, time: Timestamp) -> ReelResult<()> {
        if !self.is_seekable() {
            return Err(ReelError::NotSeekable);
        }
        let duration = self
            .video_track()
            .map(VideoTrack::duration)
            .ok_or(ReelError::NotLoaded)?;
        if time > duration {
            return Err(ReelError::InvalidArgument(format!(
                "定位目标 {time} 超出时长 {duration}"
            )));
        }

        if time == duration {
            if let Some((status, track)) = self.video.as_mut() {
                track.set_cur_frame(i64::from(track.frame_count()) - 1);
                status.chunk_search_offset = self.movi_end;
            }
            for (status, track) in &mut self.audio {
                track.reset_stream();
                track.finish();
                status.chunk_search_offset = self.movi_end;
            }
            debug!("定位到结尾 {time}");
            return Ok(());
        }

        self.seek_video_track(time)?;
        for i in 0..self.audio.len() {
            self.seek_audio_track(i, time)?;
        }
        Ok(())
    }

    fn rewind_intern(&mut self) -> ReelResult<()> {
        if !self.io.as_ref().is_some_and(IoContext::is_seekable) {
            return Err(ReelError::NotSeekable);
        }
        if let Some((status, track)) = self.video.as_mut() {
            track.rewind()?;
            status.chunk_search_offset = self.movi_start;
        }
        for (status, track) in &mut self.audio {
            track.rewind();
            status.chunk_search_offset = self.movi_start;
        }
        debug!("回到开头");
        Ok(())
    }
}
