use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "記述ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリから上位に向かって: caravel.local.yml, caravel.yml\n\
        - ~/.config/caravel/caravel.yml\n\
        または CARAVEL_CONFIG_PATH 環境変数で直接指定できます"
    )]
    DescriptorNotFound,

    #[error(
        "CARAVEL_CONFIG_PATH が存在しないパスを指しています: {0}"
    )]
    ConfigPathInvalid(PathBuf),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
