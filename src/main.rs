use std::path::PathBuf;

use accident_intake::clients::ChatAgent;
use accident_intake::orchestrator::{App, Command};
use accident_intake::utils::logging;
use accident_intake::workflow::FormKind;
use accident_intake::Config;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "Zgłaszanie wypadków przy pracy", long_about = None)]
struct Cli {
    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 交互式聊天，收集事故信息
    Chat {
        /// 聊天助手 (data-collector / statement-collector / report-collector)
        #[arg(short, long)]
        agent: Option<ChatAgent>,
        /// 写入的表单 (victim / report)
        #[arg(short, long, default_value = "victim")]
        form: FormKind,
    },
    /// 上传 PDF 文档并运行形式分析
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 编辑表单并输出提交内容
    Record {
        #[arg(short, long, default_value = "victim")]
        form: FormKind,
        /// `path=value`，值按 JSON 解析，失败时作为文本
        #[arg(short, long = "set")]
        assignments: Vec<String>,
    },
    /// 查看会话 id
    Session {
        /// 生成新的会话 id
        #[arg(long)]
        new: bool,
    },
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Chat { agent, form } => Command::Chat { agent, form },
            Commands::Analyze { files } => Command::Analyze { files },
            Commands::Record { form, assignments } => Command::Record { form, assignments },
            Commands::Session { new } => Command::Session { renew: new },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run(cli.command.into()).await?;

    Ok(())
}
