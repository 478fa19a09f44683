//! Caravel の記述ファイル発見
//!
//! 記述ファイル（caravel.yml / caravel.local.yml）のパス探索と、
//! ユーザー設定ディレクトリの解決を提供します。ロード自体は
//! 発見したパスを受け取る caravel-core 側が行います。

pub mod error;

pub use error::*;

use std::path::PathBuf;

/// Caravelの設定ディレクトリパスを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("caravel");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// プロジェクトの記述ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 CARAVEL_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリから上位に向かって: caravel.local.yml, caravel.yml
/// 3. ~/.config/caravel/caravel.yml (グローバル設定)
pub fn find_descriptor_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("CARAVEL_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::ConfigPathInvalid(path));
    }

    let current_dir = std::env::current_dir()?;
    let candidates = ["caravel.local.yml", "caravel.yml"];

    // 2. カレントディレクトリから上位に向かって検索
    let mut dir = Some(current_dir.as_path());
    while let Some(d) = dir {
        for filename in &candidates {
            let path = d.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
        dir = d.parent();
    }

    // 3. グローバル設定ファイル (~/.config/caravel/caravel.yml)
    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("caravel.yml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    // どの記述ファイルも見つからなかった
    Err(ConfigError::DescriptorNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let result = get_config_dir();
        assert!(result.is_ok());

        let config_dir = result.unwrap();
        assert!(config_dir.ends_with("caravel"));
        assert!(config_dir.exists());
    }

    #[test]
    #[serial]
    fn test_find_descriptor_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("caravel.yml"), "services: {}").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_descriptor_file();
        assert!(result.is_ok());
        assert!(result.unwrap().ends_with("caravel.yml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_local_override_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("caravel.yml"), "services: {}").unwrap();
        fs::write(temp_dir.path().join("caravel.local.yml"), "services: {}").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_descriptor_file().unwrap();
        // caravel.local.yml が優先される
        assert!(result.ends_with("caravel.local.yml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_descriptor_in_parent_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("caravel.yml"), "services: {}").unwrap();
        let subdir = temp_dir.path().join("backend/api");
        fs::create_dir_all(&subdir).unwrap();

        std::env::set_current_dir(&subdir).unwrap();

        let result = find_descriptor_file().unwrap();
        assert!(result.ends_with("caravel.yml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_env_var_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yml");
        fs::write(&config_path, "services: {}").unwrap();

        unsafe {
            std::env::set_var("CARAVEL_CONFIG_PATH", config_path.to_str().unwrap());
        }

        let result = find_descriptor_file().unwrap();
        assert_eq!(result, config_path);

        unsafe {
            std::env::remove_var("CARAVEL_CONFIG_PATH");
        }
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_path_is_error() {
        unsafe {
            std::env::set_var("CARAVEL_CONFIG_PATH", "/nonexistent/caravel.yml");
        }

        let result = find_descriptor_file();
        assert!(matches!(result, Err(ConfigError::ConfigPathInvalid(_))));

        unsafe {
            std::env::remove_var("CARAVEL_CONFIG_PATH");
        }
    }

}
