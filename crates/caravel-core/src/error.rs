use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("YAMLパースエラー: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("サービスが見つかりません: {0}")]
    ServiceNotFound(String),

    #[error(
        "サービス '{service}' の depends_on が未定義のサービスを参照しています: {target}"
    )]
    UnknownDependency { service: String, target: String },

    #[error("循環依存が検出されました: {0}")]
    CircularDependency(String),

    #[error(
        "ホストポート {port} が複数のサービスで宣言されています: {first}, {second}\nヒント: ホストポートはサービスごとに一意である必要があります"
    )]
    DuplicateHostPort {
        port: u16,
        first: String,
        second: String,
    },

    #[error("サービス '{0}' に image と build のどちらも指定されていません")]
    MissingImage(String),

    #[error("無効なポート指定: {0}\n期待する形式: \"HOST:CONTAINER\" または \"IP:HOST:CONTAINER\"（末尾に /udp 可）")]
    InvalidPort(String),

    #[error("無効なボリューム指定: {0}\n期待する形式: \"HOST:CONTAINER\" または \"HOST:CONTAINER:ro\"")]
    InvalidVolume(String),

    #[error("env_file の読み込みに失敗しました: {path}\n理由: {message}")]
    EnvFile { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, DescriptorError>;
