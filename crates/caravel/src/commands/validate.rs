use colored::Colorize;

pub async fn handle() -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    // 記述ファイルを検出
    let descriptor_path = match caravel_config::find_descriptor_file() {
        Ok(path) => path,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 記述ファイルが見つかりません".red().bold());
            eprintln!("  {}", e);
            eprintln!();
            eprintln!("caravel.yml が存在するディレクトリで実行してください");
            std::process::exit(1);
        }
    };

    println!(
        "記述ファイル: {}",
        descriptor_path.display().to_string().cyan()
    );

    // ロード時に依存グラフとポートの検証が走る
    let descriptor = match caravel_core::load_project_from_file(&descriptor_path) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  プロジェクト: {}", descriptor.name.cyan());
    println!("  サービス: {}個", descriptor.services.len());
    for name in descriptor.service_names() {
        let service = &descriptor.services[name];
        let image = service
            .image
            .clone()
            .unwrap_or_else(|| "(ビルド)".to_string());
        if service.depends_on.is_empty() {
            println!("    - {} ({})", name.cyan(), image);
        } else {
            println!(
                "    - {} ({}, depends_on: {})",
                name.cyan(),
                image,
                service.depends_on.join(", ")
            );
        }
    }

    // 起動順序も表示（検証済みなので必ず成功する）
    let order = caravel_core::start_order(&descriptor)?;
    println!("  起動順序: {}", order.join(" → ").cyan());

    Ok(())
}
