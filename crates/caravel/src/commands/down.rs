use crate::docker;
use crate::utils;
use colored::Colorize;

pub async fn handle(
    descriptor: &caravel_core::Descriptor,
    project_root: &std::path::Path,
    remove: bool,
) -> anyhow::Result<()> {
    println!("{}", "環境を停止中...".yellow());
    utils::print_loaded_config_files(project_root);
    println!("プロジェクト: {}", descriptor.name.cyan());

    // 停止は起動の逆順（依存するサービスが先に止まる）
    let order = caravel_core::stop_order(descriptor)?;

    println!();
    println!("{}", format!("停止順序 ({} 個):", order.len()).bold());
    for service_name in &order {
        println!("  • {}", service_name.cyan());
    }

    // Docker接続
    println!();
    println!("{}", "Dockerに接続中...".blue());
    let docker_conn = docker::init_docker_with_error_handling().await?;

    // 各サービスを停止
    for service_name in &order {
        println!();
        println!(
            "{}",
            format!("■ {} を停止中...", service_name).yellow().bold()
        );

        let service = descriptor.service(service_name)?;
        let container_name =
            caravel_container::container_name(&descriptor.name, service_name, service);

        // コンテナを停止
        match docker_conn
            .stop_container(
                &container_name,
                None::<bollard::query_parameters::StopContainerOptions>,
            )
            .await
        {
            Ok(_) => {
                println!("  ✓ 停止完了");

                if remove {
                    remove_container(&docker_conn, &container_name).await;
                }
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => {
                println!("  ℹ コンテナは既に停止しています");

                if remove {
                    remove_container(&docker_conn, &container_name).await;
                }
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                println!("  ℹ コンテナが見つかりません");
            }
            Err(e) => {
                println!("  ⚠ 停止エラー: {}", e);
            }
        }
    }

    // ネットワーク削除
    if remove {
        let network_name = caravel_container::network_name(&descriptor.name);
        println!();
        println!(
            "{}",
            format!("🌐 ネットワーク削除: {}", network_name).yellow()
        );

        match docker_conn.remove_network(&network_name).await {
            Ok(_) => {
                println!("  ✓ ネットワーク削除完了");
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                println!("  ℹ ネットワークは既に存在しません");
            }
            Err(e) => {
                // コンテナがまだ接続されている可能性
                println!("  ⚠ ネットワーク削除エラー: {}", e);
            }
        }
    }

    println!();
    if remove {
        println!(
            "{}",
            "✓ すべてのサービスが停止・削除されました！".green().bold()
        );
    } else {
        println!("{}", "✓ すべてのサービスが停止しました！".green().bold());
        println!(
            "{}",
            "  コンテナを削除するには --remove フラグを使用してください".dimmed()
        );
    }

    Ok(())
}

async fn remove_container(docker_conn: &bollard::Docker, container_name: &str) {
    match docker_conn
        .remove_container(
            container_name,
            None::<bollard::query_parameters::RemoveContainerOptions>,
        )
        .await
    {
        Ok(_) => println!("  ✓ 削除完了"),
        Err(e) => println!("  ⚠ 削除エラー: {}", e),
    }
}
