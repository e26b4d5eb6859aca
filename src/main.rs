use anyhow::Result;

mod auth;
mod calendar;
mod commands;
mod config;
mod error;
mod mail;
mod utils;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // 1. 初始化日志（输出到 stderr，不污染 JSON 结果）
    if let Err(e) = init_logger() {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    // 2. 定位 credentials.json / token.json
    let settings = match config::Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("📁 凭据目录: {}", settings.token_path.display());

    // 3. 解析并执行命令
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let code = commands::dispatch(std::env::args_os(), &settings, &mut stdout, &mut stderr).await;

    std::process::exit(code);
}

fn init_logger() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}
