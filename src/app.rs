//! 进程级流程：启动 (配置 -> 加载 -> 合并 -> agent) 与退出码

use crate::config::{AppConfig, EnvSettings};
use crate::console::LineReader;
use crate::data::{merge_tables, TableLoader, JOIN_KEY};
use crate::error::{AppError, ConfigError};
use crate::service::{log_session_end, AgentBridge, QueryLoop};
use std::future::Future;
use std::io::Write;
use std::process::ExitCode;
use tracing::{error, info};

/// 配置 -> 加载 -> 合并 -> 创建 agent；任一步失败都是致命错误
pub fn startup(settings: Result<EnvSettings, ConfigError>) -> Result<AgentBridge, AppError> {
    let config = AppConfig::from_settings(settings?)?;
    info!("Loaded config: {:?}", config);

    let header = TableLoader::header(&config).load();
    let items = TableLoader::items(&config).load();

    let merged = match merge_tables(header.as_ref().ok(), items.as_ref().ok(), JOIN_KEY) {
        Ok(table) => table,
        Err(merge_err) => {
            // 加载失败是根因，优先上报
            if let Err(e) = header {
                return Err(e.into());
            }
            if let Err(e) = items {
                return Err(e.into());
            }
            return Err(merge_err.into());
        }
    };
    info!("Data loaded successfully: {} records", merged.row_count());

    Ok(AgentBridge::from_config(&config, merged)?)
}

/// 启动失败：记录错误链，输出收尾日志，退出码 1
pub fn startup_failed(err: AppError) -> ExitCode {
    let err = anyhow::Error::new(err);
    error!("startup failed: {err:#}");
    log_session_end(None);
    ExitCode::FAILURE
}

/// 运行查询循环直到结束；控制台错误时退出码 1
pub async fn run_session<R, W, F>(
    bridge: &AgentBridge,
    reader: &mut R,
    out: &mut W,
    interrupt: F,
) -> ExitCode
where
    R: LineReader,
    W: Write,
    F: Future<Output = ()>,
{
    match QueryLoop::new(bridge).run(reader, out, interrupt).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            let err = anyhow::Error::new(e);
            error!("session aborted: {err:#}");
            ExitCode::FAILURE
        }
    }
}
