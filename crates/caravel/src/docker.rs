use colored::Colorize;
use futures_util::stream::StreamExt;

/// Docker config.json からレジストリの認証情報を取得
pub fn get_docker_credentials(registry: &str) -> Option<bollard::auth::DockerCredentials> {
    // ~/.docker/config.json を読み込み
    let home = std::env::var("HOME").ok()?;
    let config_path = format!("{}/.docker/config.json", home);
    let config_content = std::fs::read_to_string(&config_path).ok()?;
    let config: serde_json::Value = serde_json::from_str(&config_content).ok()?;

    // auths セクションからレジストリの認証情報を取得
    let auths = config.get("auths")?.as_object()?;
    let auth_entry = auths.get(registry)?;
    let auth_b64 = auth_entry.get("auth")?.as_str()?;

    // Base64 デコード (username:password 形式)
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth_b64)
        .ok()?;
    let auth_str = String::from_utf8(decoded).ok()?;
    let (username, password) = auth_str.split_once(':')?;

    Some(bollard::auth::DockerCredentials {
        username: Some(username.to_string()),
        password: Some(password.to_string()),
        serveraddress: Some(registry.to_string()),
        ..Default::default()
    })
}

/// イメージ名からレジストリを抽出
pub fn extract_registry(image: &str) -> Option<&str> {
    // ghcr.io/owner/repo:tag のような形式
    // docker.io/library/nginx:latest のような形式
    // 最初の / の前がレジストリ
    if image.contains('/') {
        let parts: Vec<&str> = image.split('/').collect();
        let first = parts[0];
        // レジストリは . または : を含む（例: ghcr.io, localhost:5000）
        if first.contains('.') || first.contains(':') {
            return Some(first);
        }
    }
    None
}

/// イメージ名とタグを分離
///
/// レジストリのポート区切りはタグではない: 最後の ":" 以降に "/" を
/// 含む場合はタグなしと見なす。
/// 例: "redis:latest" -> ("redis", "latest")
///     "postgres" -> ("postgres", "latest")
///     "localhost:5000/app" -> ("localhost:5000/app", "latest")
pub fn parse_image_tag(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}

/// イメージをレジストリから取得する
///
/// 進捗は同じ行を上書きして表示。~/.docker/config.json に対象
/// レジストリの認証情報があればそれを使う。
pub async fn pull_image(docker: &bollard::Docker, image: &str) -> anyhow::Result<()> {
    let (image_name, tag) = parse_image_tag(image);

    println!("  ↓ イメージを取得中: {}", image.cyan());

    let credentials = extract_registry(image).and_then(get_docker_credentials);

    #[allow(deprecated)]
    let options = bollard::image::CreateImageOptions {
        from_image: image_name,
        tag,
        ..Default::default()
    };

    #[allow(deprecated)]
    let mut stream = docker.create_image(Some(options), None, credentials);

    while let Some(info) = stream.next().await {
        match info {
            Ok(bollard::models::CreateImageInfo {
                status: Some(status),
                progress,
                ..
            }) => {
                match progress {
                    Some(progress) => print!("\r  ↓ {}: {}", status, progress),
                    None => print!("\r  ↓ {}                    ", status),
                }
                use std::io::Write;
                std::io::stdout().flush()?;
            }
            Err(e) => {
                println!();
                return Err(anyhow::anyhow!("イメージの取得に失敗しました: {}", e));
            }
            _ => {}
        }
    }

    println!();
    println!("  ✓ イメージの取得完了");

    Ok(())
}

/// Docker接続を初期化（エラーハンドリング付き）
pub async fn init_docker_with_error_handling() -> anyhow::Result<bollard::Docker> {
    match bollard::Docker::connect_with_local_defaults() {
        Ok(docker) => {
            // 接続テスト
            match docker.ping().await {
                Ok(_) => Ok(docker),
                Err(e) => {
                    print_docker_connection_error(&e);
                    Err(anyhow::anyhow!("Docker接続に失敗しました"))
                }
            }
        }
        Err(e) => {
            print_docker_connection_error(&e);
            Err(anyhow::anyhow!("Docker接続に失敗しました"))
        }
    }
}

fn print_docker_connection_error(e: &bollard::errors::Error) {
    eprintln!();
    eprintln!("{}", "✗ Docker接続エラー".red().bold());
    eprintln!();
    eprintln!("{}", "原因:".yellow());
    eprintln!("  {}", e);
    eprintln!();
    eprintln!("{}", "解決方法:".yellow());
    eprintln!("  • Dockerが起動しているか確認してください");
    eprintln!("  • OrbStackまたはDocker Desktopがインストールされているか確認してください");
    eprintln!("  • docker ps コマンドが正常に動作するか確認してください");
}
