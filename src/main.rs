use nf_agent_rust::config::EnvSettings;
use nf_agent_rust::console::ConsoleReader;
use nf_agent_rust::{app, logging};
use std::process::ExitCode;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 加载 .env (已存在的环境变量优先)
    dotenvy::dotenv().ok();

    let settings = EnvSettings::from_env();
    logging::init(settings.as_ref().ok().and_then(|s| s.log_level.as_deref()));
    info!("Starting CSV analysis agent");

    let bridge = match app::startup(settings) {
        Ok(bridge) => bridge,
        Err(e) => return app::startup_failed(e),
    };
    let mut reader = match ConsoleReader::new() {
        Ok(reader) => reader,
        Err(e) => return app::startup_failed(e.into()),
    };

    // 循环开始时首次轮询即注册 SIGINT 处理；注册失败时永不触发
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let mut stdout = std::io::stdout();
    app::run_session(&bridge, &mut reader, &mut stdout, interrupt).await
}
