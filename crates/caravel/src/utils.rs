use colored::Colorize;

/// 読み込んだ設定ファイル情報を表示
pub fn print_loaded_config_files(project_root: &std::path::Path) {
    println!("📄 読み込んだ設定ファイル:");

    let descriptor = project_root.join(caravel_core::DESCRIPTOR_FILE);
    if descriptor.exists() {
        println!("  • {}", descriptor.display().to_string().cyan());
    }

    let local_override = project_root.join(caravel_core::LOCAL_OVERRIDE_FILE);
    if local_override.exists() {
        println!(
            "  • {} (ローカルオーバーライド)",
            local_override.display().to_string().cyan()
        );
    }
}
