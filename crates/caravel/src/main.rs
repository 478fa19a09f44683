mod commands;
mod docker;
mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "caravel")]
#[command(about = "書いて、流す。ローカル環境は一枚のYAMLで動く。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 環境を起動
    Up {
        /// 起動前に最新イメージをpullする
        #[arg(short, long)]
        pull: bool,
    },
    /// 環境を停止
    Down {
        /// コンテナを削除する（デフォルトは停止のみ）
        #[arg(short, long)]
        remove: bool,
    },
    /// コンテナの一覧を表示
    Ps {
        /// 停止中のコンテナも表示
        #[arg(short, long)]
        all: bool,
    },
    /// コンテナのログを表示
    Logs {
        /// サービス名（指定しない場合は全サービス）
        #[arg(short = 'n', long)]
        service: Option<String>,
        /// ログの行数を指定
        #[arg(short = 'l', long, default_value = "100")]
        lines: usize,
        /// ログをリアルタイムで追跡
        #[arg(short, long)]
        follow: bool,
    },
    /// 設定を検証
    Validate,
    /// Dockerイメージをビルド
    Build {
        /// ビルド対象のサービス（省略時はbuild設定を持つ全サービス）
        #[arg(short = 'n', long)]
        service: Option<String>,
        /// キャッシュを使用しない
        #[arg(long)]
        no_cache: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力
    tracing_subscriber::fmt::init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("caravel {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Validateコマンドは独自にロードし、エラーを詳細表示する
    if matches!(cli.command, Commands::Validate) {
        return commands::validate::handle().await;
    }

    // 記述ファイルを検索してロード。プロジェクトルートは
    // 発見されたファイルの親ディレクトリ
    let descriptor_path = caravel_config::find_descriptor_file()?;
    let project_root = descriptor_path
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let descriptor = caravel_core::load_project_from_file(&descriptor_path)?;

    // コマンドディスパッチ
    match cli.command {
        Commands::Up { pull } => {
            commands::up::handle(&descriptor, &project_root, pull).await?;
        }
        Commands::Down { remove } => {
            commands::down::handle(&descriptor, &project_root, remove).await?;
        }
        Commands::Ps { all } => {
            commands::ps::handle(&descriptor, &project_root, all).await?;
        }
        Commands::Logs {
            service,
            lines,
            follow,
        } => {
            commands::logs::handle(&descriptor, &project_root, service, lines, follow).await?;
        }
        Commands::Build { service, no_cache } => {
            commands::build::handle(&descriptor, &project_root, service.as_deref(), no_cache)
                .await?;
        }
        Commands::Validate | Commands::Version => {
            unreachable!("handled before config loading");
        }
    }

    Ok(())
}
