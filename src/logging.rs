use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// 默认日志级别
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

/// 解析日志级别，兼容 Python logging 的命名 (WARNING / CRITICAL)
pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(LevelFilter::TRACE),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARN" | "WARNING" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Some(LevelFilter::ERROR),
        "OFF" | "NONE" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// 初始化日志 - 使用本地时间格式
///
/// `RUST_LOG` 存在时优先于 `LOG_LEVEL`。返回实际生效的默认级别。
pub fn init(raw_level: Option<&str>) -> LevelFilter {
    let parsed = raw_level.map(|raw| (raw, parse_level(raw)));
    let level = parsed
        .and_then(|(_, level)| level)
        .unwrap_or(DEFAULT_LOG_LEVEL);

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    if let Some((raw, None)) = parsed {
        tracing::warn!(log_level = raw, "unknown LOG_LEVEL, falling back to INFO");
    }

    level
}
