mod config;
mod envinfo;
mod export;
mod nvm;
mod tui;

use anyhow::Result;
use env_logger::Env;

#[tokio::main]
async fn main() -> Result<()> {
    // 界面占用终端，日志默认关闭，需要时用 RUST_LOG 打开并重定向 stderr
    env_logger::Builder::from_env(Env::default().default_filter_or("off")).init();

    // 加载配置
    let config = config::Config::load_or_default()?;
    log::info!("nvm 命令: {}", config.nvm_command);

    tui::run(config).await?;

    Ok(())
}
