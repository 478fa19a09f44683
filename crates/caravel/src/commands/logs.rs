use crate::docker;
use crate::utils;
use colored::Colorize;

pub async fn handle(
    descriptor: &caravel_core::Descriptor,
    project_root: &std::path::Path,
    service: Option<String>,
    lines: usize,
    follow: bool,
) -> anyhow::Result<()> {
    println!("{}", "ログを取得中...".blue());
    utils::print_loaded_config_files(project_root);

    // Docker接続
    let docker_conn = docker::init_docker_with_error_handling().await?;

    // 対象サービスの決定
    let target_services: Vec<String> = if let Some(service_name) = service {
        // 存在しないサービス名は早期にエラー
        descriptor.service(&service_name)?;
        vec![service_name]
    } else {
        descriptor
            .service_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    };

    println!();

    // 複数サービスの場合は色を割り当て
    let colors = [
        colored::Color::Cyan,
        colored::Color::Green,
        colored::Color::Yellow,
        colored::Color::Magenta,
        colored::Color::Blue,
    ];

    for (idx, service_name) in target_services.iter().enumerate() {
        let svc = descriptor.service(service_name)?;
        let container_name =
            caravel_container::container_name(&descriptor.name, service_name, svc);
        let service_color = colors[idx % colors.len()];

        if !follow {
            println!(
                "{}",
                format!("=== {} のログ ===", service_name)
                    .bold()
                    .color(service_color)
            );
        }

        #[allow(deprecated)]
        let options = bollard::container::LogsOptions::<String> {
            follow,
            stdout: true,
            stderr: true,
            tail: lines.to_string(),
            timestamps: true,
            ..Default::default()
        };

        use bollard::container::LogOutput;
        use futures_util::stream::StreamExt;

        let mut log_stream = docker_conn.logs(&container_name, Some(options));

        while let Some(log) = log_stream.next().await {
            match log {
                Ok(output) => {
                    let prefix = format!("[{}]", service_name).color(service_color);

                    match output {
                        LogOutput::StdOut { message } => {
                            let msg = String::from_utf8_lossy(&message);
                            for line in msg.lines() {
                                if !line.is_empty() {
                                    println!("{} {}", prefix, line);
                                }
                            }
                        }
                        LogOutput::StdErr { message } => {
                            let msg = String::from_utf8_lossy(&message);
                            for line in msg.lines() {
                                if !line.is_empty() {
                                    println!("{} {} {}", prefix, "stderr:".red(), line);
                                }
                            }
                        }
                        LogOutput::Console { message } => {
                            let msg = String::from_utf8_lossy(&message);
                            for line in msg.lines() {
                                if !line.is_empty() {
                                    println!("{} {}", prefix, line);
                                }
                            }
                        }
                        LogOutput::StdIn { .. } => {}
                    }
                }
                Err(e) => {
                    eprintln!("  ⚠ ログ取得エラー ({}): {}", service_name, e);
                    break;
                }
            }
        }

        if !follow {
            println!();
        }
    }

    if follow {
        println!();
        println!("{}", "Ctrl+C でログ追跡を終了".dimmed());
    }

    Ok(())
}
