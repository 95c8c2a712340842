//! 日志初始化模块.
//!
//! 双输出 (统一级别):
//! - console: 彩色, 带时间戳
//! - file: 无色, 按天滚动, 非阻塞写入
//!
//! 级别优先级: REEL_LOG 环境变量 > [`LoggingConfig::level`].
//! 命令行工具通过 [`verbosity_directives`] 把 `-v` 计数换算为级别.
//!
//! 日志文件输出到 `{directory}/{file_prefix}.{date}.log`, 初始化时删除超过保留天数的旧文件.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// 覆盖日志级别的环境变量
pub const LOG_ENV: &str = "REEL_LOG";

/// 本项目所有 crate 的 target 前缀 (用于 -vv 级别的定向 trace)
const REEL_CRATE_TARGETS: &[&str] = &[
    "reel",
    "reel_core",
    "reel_codec",
    "reel_format",
    "reel_probe",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_directory")]
    pub directory: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_directory() -> String {
    "logs".to_string()
}

fn default_file_prefix() -> String {
    "reel".to_string()
}

fn default_retention_days() -> i64 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            retention_days: default_retention_days(),
        }
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 根据 verbosity 生成过滤指令
///
/// - 0: info
/// - 1: debug
/// - 2: trace (仅 reel crate, 第三方依赖保持 info)
/// - 3+: trace (全局, 含第三方依赖)
pub fn verbosity_directives(verbosity: u8) -> String {
    match verbosity {
        0 => "info".to_string(),
        1 => "debug".to_string(),
        2 => {
            let mut directives = REEL_CRATE_TARGETS
                .iter()
                .map(|t| format!("{t}=trace"))
                .collect::<Vec<_>>();
            directives.push("info".to_string());
            directives.join(",")
        }
        _ => "trace".to_string(),
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level))
}

/// 初始化日志系统
///
/// `log` 宏产生的记录经由 tracing-subscriber 的 tracing-log 桥接输出.
pub fn init(config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("创建日志目录失败, path={}", config.directory))?;

    let today = Local::now().date_naive();
    match cleanup_logs(
        Path::new(&config.directory),
        &config.file_prefix,
        config.retention_days,
        today,
    ) {
        Ok(removed) if removed > 0 => eprintln!("已清理 {removed} 个过期日志文件"),
        Ok(_) => {}
        Err(err) => eprintln!("清理日志失败: {err:#}"),
    }

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.directory)
        .context("创建日志文件失败")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(ConsoleFormatter)
        .with_filter(build_filter(&config.level));

    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(build_filter(&config.level));

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("日志系统已经初始化")?;

    Ok(())
}

pub(crate) fn build_current_log_path(directory: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}.log", prefix, date.format("%Y-%m-%d")))
}

/// 从文件名 `{prefix}.{date}.log` 中解析日期
fn parse_log_date(file_name: &str, prefix: &str) -> Option<NaiveDate> {
    let date = file_name
        .strip_prefix(prefix)?
        .strip_prefix('.')?
        .strip_suffix(".log")?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// 删除早于 `today - retention_days` 的日志文件, 返回删除数量
pub(crate) fn cleanup_logs(
    directory: &Path,
    prefix: &str,
    retention_days: i64,
    today: NaiveDate,
) -> Result<usize> {
    let Some(cutoff) = today.checked_sub_signed(chrono::Duration::days(retention_days.max(0)))
    else {
        return Ok(0);
    };

    let mut removed = 0;
    let entries = std::fs::read_dir(directory)
        .with_context(|| format!("读取日志目录失败, path={}", directory.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(date) = name.to_str().and_then(|n| parse_log_date(n, prefix)) else {
            continue;
        };
        if date < cutoff {
            std::fs::remove_file(entry.path())
                .with_context(|| format!("删除日志文件失败, path={}", entry.path().display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Console 格式: 彩色, 带时间戳和源码位置
struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now();
        let meta = event.metadata();
        let color = match *meta.level() {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        };
        write!(
            writer,
            "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] {}{:5}\x1b[0m {} > ",
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_millis(),
            color,
            meta.level().to_string(),
            meta.target()
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// File 格式: 无色, 不带 target
struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now();
        write!(
            writer,
            "[{}] {:5} > ",
            now.format("%Y-%m-%d %H:%M:%S%.3f"),
            event.metadata().level().to_string()
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        match NaiveDate::from_ymd_opt(y, m, d) {
            Some(date) => date,
            None => panic!("测试日期初始化失败"),
        }
    }

    #[test]
    fn test_build_current_log_path() {
        let path = build_current_log_path(Path::new("logs"), "reel-probe", date(2026, 2, 6));
        assert_eq!(path, PathBuf::from("logs/reel-probe.2026-02-06.log"));
    }

    #[test]
    fn test_parse_log_date() {
        assert_eq!(
            parse_log_date("reel.2026-01-31.log", "reel"),
            Some(date(2026, 1, 31))
        );
        assert_eq!(parse_log_date("reel-probe.2026-01-31.log", "reel"), None);
        assert_eq!(parse_log_date("reel.notes.log", "reel"), None);
    }

    #[test]
    fn test_cleanup_logs_删除过期文件() {
        let dir = tempfile::tempdir().unwrap();
        let today = date(2026, 3, 10);
        for name in [
            "reel.2026-03-10.log",
            "reel.2026-03-01.log",
            "reel.2026-02-01.log",
            "other.2026-01-01.log",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let removed = cleanup_logs(dir.path(), "reel", 7, today).unwrap();
        assert_eq!(removed, 2);
        assert!(dir.path().join("reel.2026-03-10.log").exists());
        assert!(!dir.path().join("reel.2026-03-01.log").exists());
        assert!(dir.path().join("other.2026-01-01.log").exists());
    }

    #[test]
    fn test_verbosity_directives() {
        assert_eq!(verbosity_directives(0), "info");
        assert_eq!(verbosity_directives(1), "debug");
        let targeted = verbosity_directives(2);
        assert!(targeted.contains("reel_format=trace"));
        assert!(targeted.ends_with(",info"));
        assert_eq!(verbosity_directives(9), "trace");
    }

    #[test]
    fn test_logging_config_默认值() {
        let config: LoggingConfig = serde_json::from_str(r#"{"level":"debug"}"#).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.directory, "logs");
        assert_eq!(config.retention_days, 30);
    }
}
