use anyhow::Context;
use clap::{Parser, Subcommand};
use file_manager_client::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    logging, AppState, FileEntry, UploadFile,
};
use std::path::PathBuf;
use tracing::info;

/// 文件管理服务命令行客户端
#[derive(Debug, Parser)]
#[command(name = "fmc", version, about)]
struct Cli {
    /// 配置文件路径
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// 覆盖配置中的服务地址
    #[arg(long)]
    base_url: Option<String>,

    /// 覆盖配置中的授权令牌
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 检查服务是否可达
    Ping,
    /// 列出目录内容
    List {
        /// 目录前缀
        prefix: Option<String>,
    },
    /// 创建文件夹
    Mkdir {
        name: String,
    },
    /// 上传本地文件
    Upload {
        /// 远端目标目录
        remote_path: String,
        /// 本地文件
        local_file: PathBuf,
    },
}

fn print_entries(files: &[FileEntry]) {
    for file in files {
        let marker = if file.is_folder() { "d" } else { "-" };
        println!("{} {:>10} {}", marker, file.size, file.name);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config).await;
    if let Some(base_url) = cli.base_url {
        config.client.base_url = base_url;
    }
    if let Some(token) = cli.token {
        config.client.token = Some(token);
    }

    // 初始化日志系统（必须保持 _log_guard 存活）
    let _log_guard = logging::init_logging(&config.log);

    let state = AppState::new(config).context("初始化应用状态失败")?;

    run(&state, cli.command).await.context("请求失败")
}

/// 执行一条命令
///
/// 无论命令成功与否，返回前都会取消订阅并关闭应用状态
async fn run(state: &AppState, command: Command) -> anyhow::Result<()> {
    // 列表变化时输出到控制台
    let list_sub = state.file_list.subscribe(|files| {
        if !files.is_empty() {
            print_entries(files);
        }
    });
    let data_sub = state.api_data.subscribe(|items| {
        for item in items {
            println!("{}", item);
        }
    });

    let result = execute(state, command).await;

    list_sub.unsubscribe();
    data_sub.unsubscribe();
    state.shutdown();

    result
}

async fn execute(state: &AppState, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Ping => {
            let text = state.client.ping().await?;
            println!("{}", text.trim());
        }
        Command::List { prefix } => {
            let files = state.refresh_file_list(prefix.as_deref()).await?;
            info!("共 {} 项", files.len());
        }
        Command::Mkdir { name } => {
            state.create_folder(&name).await?;
            info!("✓ 文件夹已创建: {}", name);
        }
        Command::Upload {
            remote_path,
            local_file,
        } => {
            let file = UploadFile::from_path(&local_file).await?;
            state.upload(&remote_path, file).await?;
            info!("✓ 上传完成: {:?} -> {}", local_file, remote_path);
        }
    }
    Ok(())
}
