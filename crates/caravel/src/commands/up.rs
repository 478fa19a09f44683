use crate::docker;
use crate::utils;
use colored::Colorize;
use std::collections::{HashMap, HashSet};

/// サービスのイメージビルドを実行する共通関数
///
/// ローカルコンテキストと git URL のリモートコンテキストの両方に対応。
pub(crate) async fn build_service_image(
    docker_conn: &bollard::Docker,
    project_root: &std::path::Path,
    service_name: &str,
    service: &caravel_core::Service,
    image: &str,
    no_cache: bool,
) -> anyhow::Result<()> {
    let build = service
        .build
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("サービス '{}' に build 設定がありません", service_name))?;

    let builder = caravel_build::ImageBuilder::new(docker_conn.clone());

    // git URL はDocker Engine側でリポジトリを取得してビルド。
    // ストリームが流れ始めるまで無出力なのでスピナーを出す。
    if let Some(git_url) = build.git_url() {
        println!("  🔨 リモートコンテキストからビルド...");
        println!("  → Git: {}", git_url.cyan());
        println!("  → Image: {}", image.cyan());

        let progress = caravel_build::BuildProgress::new(service_name);
        match builder.build_image_from_git(git_url, image).await {
            Ok(()) => {
                progress.finish_success();
                return Ok(());
            }
            Err(e) => {
                progress.finish_error(&e.to_string());
                return Err(anyhow::anyhow!("{}", e.user_message()));
            }
        }
    }

    println!("  🔨 build設定があるためローカルビルドを実行...");

    let resolver = caravel_build::BuildResolver::new(project_root.to_path_buf());

    let context_path = resolver
        .resolve_context(service)
        .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?
        .ok_or_else(|| anyhow::anyhow!("ビルドコンテキストを解決できません"))?;

    let dockerfile_path = resolver
        .resolve_dockerfile(service_name, service, &context_path)
        .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?;

    let variables: HashMap<String, String> = std::env::vars().collect();
    let build_args = resolver.resolve_build_args(service, &variables);
    let target = build.target().map(|t| t.to_string());

    println!(
        "  → Dockerfile: {}",
        dockerfile_path.display().to_string().cyan()
    );
    println!("  → Context: {}", context_path.display().to_string().cyan());
    println!("  → Image: {}", image.cyan());

    let context_data = caravel_build::ContextBuilder::create_context(&context_path, &dockerfile_path)?;

    builder
        .build_image(
            context_data,
            image,
            build_args,
            target.as_deref(),
            no_cache || build.no_cache(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?;

    println!("  {} ビルド完了", "✓".green());
    Ok(())
}

/// 1サービス分のビルド・作成・起動
///
/// 既存コンテナは再利用する: 作成済みなら起動のみ、起動済みなら
/// 何もしない（再起動しない）。
async fn start_service(
    docker_conn: &bollard::Docker,
    descriptor: &caravel_core::Descriptor,
    project_root: &std::path::Path,
    service_name: &str,
    pull: bool,
) -> anyhow::Result<()> {
    let service = descriptor.service(service_name)?;

    // サービスをコンテナ設定に変換
    let (container_config, create_options) = caravel_container::service_to_container_config(
        service_name,
        service,
        &descriptor.name,
        project_root,
    );

    #[allow(deprecated)]
    let image = container_config
        .image
        .clone()
        .ok_or_else(|| anyhow::anyhow!("イメージ名が指定されていません"))?;

    // build設定がある場合は先にビルドを実行（ローカルビルド優先）
    if service.build.is_some() {
        build_service_image(docker_conn, project_root, service_name, service, &image, false)
            .await?;
    }

    // --pull フラグが指定されていて、build設定がない場合は最新イメージをpull
    if pull && service.build.is_none() {
        docker::pull_image(docker_conn, &image).await?;
    }

    // コンテナ作成
    match docker_conn
        .create_container(Some(create_options.clone()), container_config.clone())
        .await
    {
        Ok(response) => {
            println!("  ✓ コンテナ作成: {}", response.id);

            docker_conn
                .start_container(
                    &response.id,
                    None::<bollard::query_parameters::StartContainerOptions>,
                )
                .await
                .map_err(|e| anyhow::anyhow!("コンテナ起動に失敗: {}", e))?;
            println!("  ✓ 起動完了");
            Ok(())
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 409, ..
        }) => {
            // コンテナが既に存在する場合は作成をスキップして起動のみ
            println!("  ℹ コンテナは既に存在します");
            #[allow(deprecated)]
            let container_name = &create_options.name;

            match docker_conn
                .start_container(
                    container_name,
                    None::<bollard::query_parameters::StartContainerOptions>,
                )
                .await
            {
                Ok(_) => {
                    println!("  ✓ 既存コンテナを起動");
                    Ok(())
                }
                Err(bollard::errors::Error::DockerResponseServerError {
                    status_code: 304, ..
                }) => {
                    // 起動済みのコンテナには手を付けない
                    println!("  ✓ コンテナは既に起動中です");
                    Ok(())
                }
                Err(e) => Err(anyhow::anyhow!("コンテナ起動に失敗: {}", e)),
            }
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => {
            // イメージが見つからない場合はpull/buildしてから再試行
            println!("  ℹ イメージが見つかりません: {}", image.cyan());
            if service.build.is_some() {
                build_service_image(docker_conn, project_root, service_name, service, &image, false)
                    .await?;
            } else {
                docker::pull_image(docker_conn, &image).await?;
            }

            let response = docker_conn
                .create_container(Some(create_options.clone()), container_config.clone())
                .await
                .map_err(|e| anyhow::anyhow!("コンテナ作成に失敗: {}", e))?;

            println!("  ✓ コンテナ作成: {}", response.id);

            docker_conn
                .start_container(
                    &response.id,
                    None::<bollard::query_parameters::StartContainerOptions>,
                )
                .await
                .map_err(|e| anyhow::anyhow!("コンテナ起動に失敗: {}", e))?;
            println!("  ✓ 起動完了");
            Ok(())
        }
        Err(e) => {
            let err_str = e.to_string();
            if err_str.contains("port is already allocated") {
                eprintln!();
                eprintln!("{}", "✗ ポートが既に使用されています".red().bold());
                eprintln!();
                eprintln!("{}", "原因:".yellow());
                eprintln!("  {}", err_str);

                // ホスト側でポートを掴んでいるプロセスを特定
                for port in &service.ports {
                    let pids = caravel_container::find_pids_by_port(port.host);
                    if !pids.is_empty() {
                        eprintln!(
                            "  ポート {} を使用中のプロセス: {}",
                            port.host,
                            pids.iter()
                                .map(|p| p.to_string())
                                .collect::<Vec<_>>()
                                .join(", ")
                        );
                    }
                }

                eprintln!();
                eprintln!("{}", "解決方法:".yellow());
                eprintln!("  • 既存の環境を停止: caravel down");
                eprintln!("  • 別のポート番号を使用してください");
                eprintln!("  • docker ps でポートを使用しているコンテナを確認してください");
            } else {
                eprintln!();
                eprintln!("{}", "✗ コンテナ作成エラー".red().bold());
                eprintln!();
                eprintln!("{}", "原因:".yellow());
                eprintln!("  {}", err_str);
            }
            Err(anyhow::anyhow!("コンテナ作成に失敗しました"))
        }
    }
}

pub async fn handle(
    descriptor: &caravel_core::Descriptor,
    project_root: &std::path::Path,
    pull: bool,
) -> anyhow::Result<()> {
    utils::print_loaded_config_files(project_root);
    println!("プロジェクト: {}", descriptor.name.cyan());

    // 起動順序の決定（ロード時に検証済みだが、順序はここで計算する）
    let order = caravel_core::start_order(descriptor)?;

    println!();
    println!("{}", format!("起動順序 ({} 個):", order.len()).bold());
    for service_name in &order {
        println!("  • {}", service_name.cyan());
    }

    // Docker接続
    println!();
    println!("{}", "Dockerに接続中...".blue());
    let docker_conn = docker::init_docker_with_error_handling().await?;

    // ネットワーク作成
    let network_name = caravel_container::network_name(&descriptor.name);
    println!();
    println!("{}", format!("🌐 ネットワーク: {}", network_name).blue());

    let network_config = bollard::models::NetworkCreateRequest {
        name: network_name.clone(),
        driver: Some("bridge".to_string()),
        ..Default::default()
    };

    match docker_conn.create_network(network_config).await {
        Ok(_) => {
            println!("  ✓ ネットワーク作成完了");
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 409, ..
        }) => {
            println!("  ℹ ネットワークは既に存在します");
        }
        Err(e) => {
            eprintln!("  ⚠ ネットワーク作成エラー: {}", e);
        }
    }

    // 事前チェック: 宣言ポートの占有状況。既存コンテナの再利用で
    // 占有されている場合もあるため、ここでは報告のみで失敗させない。
    let occupied = caravel_container::occupied_host_ports(descriptor);
    if !occupied.is_empty() {
        let ports: Vec<String> = occupied.iter().map(|(p, _)| p.to_string()).collect();
        println!();
        println!(
            "{}",
            format!("ℹ 使用中のホストポート: {}", ports.join(", ")).dimmed()
        );
    }

    // 各サービスを依存順に起動。失敗したサービスの依存先だけをスキップし、
    // 無関係なサービスは起動を続行する。
    let mut failed: HashSet<String> = HashSet::new();

    for service_name in &order {
        let blocked = caravel_core::transitive_dependents(descriptor, &failed);

        println!();
        if blocked.contains(service_name) {
            let causes: Vec<&str> = descriptor.services[service_name]
                .depends_on
                .iter()
                .filter(|d| failed.contains(*d) || blocked.contains(*d))
                .map(|d| d.as_str())
                .collect();
            println!(
                "{}",
                format!(
                    "↷ {} をスキップ（依存先が失敗: {}）",
                    service_name,
                    causes.join(", ")
                )
                .yellow()
            );
            continue;
        }

        println!(
            "{}",
            format!("▶ {} を起動中...", service_name).green().bold()
        );

        if let Err(e) =
            start_service(&docker_conn, descriptor, project_root, service_name, pull).await
        {
            eprintln!("  {} {}", "✗".red(), e);
            failed.insert(service_name.clone());
        }
    }

    println!();
    if failed.is_empty() {
        println!("{}", "✓ すべてのサービスが起動しました！".green().bold());
        Ok(())
    } else {
        let blocked = caravel_core::transitive_dependents(descriptor, &failed);
        let mut failed_names: Vec<&str> = failed.iter().map(|s| s.as_str()).collect();
        failed_names.sort_unstable();

        eprintln!(
            "{}",
            format!("✗ 起動に失敗したサービス: {}", failed_names.join(", "))
                .red()
                .bold()
        );
        if !blocked.is_empty() {
            let mut blocked_names: Vec<&str> = blocked.iter().map(|s| s.as_str()).collect();
            blocked_names.sort_unstable();
            eprintln!("  スキップされたサービス: {}", blocked_names.join(", "));
        }
        Err(anyhow::anyhow!("一部のサービスの起動に失敗しました"))
    }
}
