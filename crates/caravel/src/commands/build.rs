use crate::commands::up::build_service_image;
use crate::docker;
use crate::utils;
use colored::Colorize;

pub async fn handle(
    descriptor: &caravel_core::Descriptor,
    project_root: &std::path::Path,
    service: Option<&str>,
    no_cache: bool,
) -> anyhow::Result<()> {
    println!("{}", "イメージをビルド中...".blue());
    utils::print_loaded_config_files(project_root);

    // ビルド対象の決定（指定なしならbuild設定を持つ全サービス）
    let targets: Vec<&str> = if let Some(name) = service {
        let svc = descriptor.service(name)?;
        if svc.build.is_none() {
            return Err(anyhow::anyhow!(
                "サービス '{}' に build 設定がありません",
                name
            ));
        }
        vec![name]
    } else {
        descriptor
            .service_names()
            .into_iter()
            .filter(|n| descriptor.services[*n].build.is_some())
            .collect()
    };

    if targets.is_empty() {
        println!("{}", "build設定を持つサービスはありません".dimmed());
        return Ok(());
    }

    // Docker接続
    println!();
    println!("{}", "Dockerに接続中...".blue());
    let docker_conn = docker::init_docker_with_error_handling().await?;

    for service_name in &targets {
        let svc = descriptor.service(service_name)?;
        let image = caravel_container::resolve_image_name(service_name, svc, &descriptor.name);

        println!();
        println!(
            "{}",
            format!("🔨 {} をビルド中...", service_name).green().bold()
        );

        build_service_image(
            &docker_conn,
            project_root,
            service_name,
            svc,
            &image,
            no_cache,
        )
        .await?;
    }

    println!();
    println!("{}", "✓ すべてのイメージをビルドしました！".green().bold());

    Ok(())
}
