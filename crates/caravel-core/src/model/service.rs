//! サービス定義

use super::port::PortMapping;
use super::volume::BindMount;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// サービス定義
///
/// YAML形式：
/// ```yaml
/// backend:
///   build:
///     context: .
///     dockerfile: Dockerfile
///   command: "uvicorn main:app --reload --host 0.0.0.0"
///   ports:
///     - "8000:8000"
///   volumes:
///     - ".:/app"
///   environment:
///     - "DEBUG=True"
///   depends_on:
///     - redis
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    pub image: Option<String>,
    /// コンテナ名の明示指定（省略時は {project}-{service}）
    pub container_name: Option<String>,
    /// 起動コマンド。文字列形式は空白で分割される（クォートは
    /// 解釈しない）。クォートを含む引数はリスト形式で指定する
    #[serde(default, deserialize_with = "de_command")]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default, deserialize_with = "de_environment")]
    pub environment: HashMap<String, String>,
    /// dotenv形式の環境変数ファイル（environment が優先される）
    #[serde(default, deserialize_with = "de_string_or_seq")]
    pub env_file: Vec<PathBuf>,
    #[serde(default)]
    pub volumes: Vec<BindMount>,
    /// 起動順序のみを保証する依存関係（ヘルスチェックによるゲートはしない）
    #[serde(default, deserialize_with = "de_string_or_seq")]
    pub depends_on: Vec<String>,
    /// ビルド設定
    pub build: Option<BuildSpec>,
    /// 再起動ポリシー (no, always, on-failure, unless-stopped)。
    /// 「明示的に no を指定した」ことを未指定と区別するため Option で保持する。
    /// マージ時はこの区別が必要になる
    pub restart: Option<RestartPolicy>,
    /// 特権コンテナとして起動（ホストカーネル設定を変更するヘルパー用）
    pub privileged: Option<bool>,
}

/// 再起動ポリシー
///
/// コンテナランタイムに委譲される。プロセス監視や再試行ロジックを
/// 自前で持つことはしない。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// 再起動しない（デフォルト）
    #[default]
    No,
    /// 常に再起動
    Always,
    /// 異常終了時のみ再起動
    OnFailure,
    /// 明示的に停止しない限り再起動
    UnlessStopped,
}

/// ビルド設定
///
/// compose 互換の短縮形式（コンテキストパスまたは git URL）と
/// 詳細形式の両方を受け付ける：
/// ```yaml
/// build: .
/// build: "https://github.com/example/redis-overcommit.git"
/// build:
///   context: .
///   dockerfile: Dockerfile
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildSpec {
    /// コンテキストパスまたは git URL
    Short(String),
    /// 詳細指定
    Detailed(BuildConfig),
}

/// ビルド詳細設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// ビルドコンテキストのパス（プロジェクトルートからの相対パス）
    pub context: Option<PathBuf>,
    /// Dockerfileのパス（コンテキストからの相対パス）
    pub dockerfile: Option<PathBuf>,
    /// ビルド引数
    #[serde(default)]
    pub args: HashMap<String, String>,
    /// マルチステージビルドのターゲット
    pub target: Option<String>,
    /// キャッシュ無効化フラグ
    #[serde(default)]
    pub no_cache: bool,
}

impl BuildSpec {
    /// git URL指定かどうか
    ///
    /// Docker Engine はビルドコンテキストとしてリモートURLを直接
    /// 受け付けるため、その形式をここで判別する。
    pub fn git_url(&self) -> Option<&str> {
        match self {
            BuildSpec::Short(s)
                if s.starts_with("http://")
                    || s.starts_with("https://")
                    || s.starts_with("git://")
                    || s.starts_with("git@") =>
            {
                Some(s)
            }
            _ => None,
        }
    }

    /// ローカルコンテキストのパス（git URL の場合は None）
    pub fn context(&self) -> Option<PathBuf> {
        match self {
            BuildSpec::Short(s) => {
                if self.git_url().is_some() {
                    None
                } else {
                    Some(PathBuf::from(s))
                }
            }
            BuildSpec::Detailed(config) => {
                Some(config.context.clone().unwrap_or_else(|| PathBuf::from(".")))
            }
        }
    }

    pub fn dockerfile(&self) -> Option<&PathBuf> {
        match self {
            BuildSpec::Short(_) => None,
            BuildSpec::Detailed(config) => config.dockerfile.as_ref(),
        }
    }

    pub fn args(&self) -> HashMap<String, String> {
        match self {
            BuildSpec::Short(_) => HashMap::new(),
            BuildSpec::Detailed(config) => config.args.clone(),
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            BuildSpec::Short(_) => None,
            BuildSpec::Detailed(config) => config.target.as_deref(),
        }
    }

    pub fn no_cache(&self) -> bool {
        match self {
            BuildSpec::Short(_) => false,
            BuildSpec::Detailed(config) => config.no_cache,
        }
    }
}

impl Service {
    /// 実効的な再起動ポリシー（未指定は No）
    pub fn restart_policy(&self) -> RestartPolicy {
        self.restart.unwrap_or_default()
    }

    /// 実効的な特権フラグ（未指定は false）
    pub fn is_privileged(&self) -> bool {
        self.privileged.unwrap_or(false)
    }

    /// 他のServiceをマージする
    ///
    /// otherで定義されたフィールドが優先される（ローカルオーバーライド）。
    /// - Option<T>: otherがSomeならそれを使用、Noneなら元の値を維持。
    ///   restart / privileged もこの規則に従う: `restart: "no"` の
    ///   ようにデフォルト値を明示した指定も上書きとして扱う
    /// - Vec<T>: otherが空でなければそれを使用、空なら元の値を維持
    /// - HashMap<K, V>: 元の値にotherの値をマージ（otherが優先）
    pub fn merge(&mut self, other: Service) {
        if other.image.is_some() {
            self.image = other.image;
        }
        if other.container_name.is_some() {
            self.container_name = other.container_name;
        }
        if other.command.is_some() {
            self.command = other.command;
        }
        if other.build.is_some() {
            self.build = other.build;
        }
        if other.restart.is_some() {
            self.restart = other.restart;
        }
        if other.privileged.is_some() {
            self.privileged = other.privileged;
        }

        if !other.ports.is_empty() {
            self.ports = other.ports;
        }
        if !other.volumes.is_empty() {
            self.volumes = other.volumes;
        }
        if !other.depends_on.is_empty() {
            self.depends_on = other.depends_on;
        }
        if !other.env_file.is_empty() {
            self.env_file = other.env_file;
        }

        for (key, value) in other.environment {
            self.environment.insert(key, value);
        }
    }
}

/// command を単一文字列と引数リストの両方で受け付ける
///
/// 文字列形式は空白分割のみ。`sh -c "..."` のような引数は
/// リスト形式でしか表現できない。
fn de_command<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CommandRepr {
        Line(String),
        Argv(Vec<String>),
    }

    let argv = match CommandRepr::deserialize(deserializer)? {
        CommandRepr::Line(line) => line.split_whitespace().map(String::from).collect(),
        CommandRepr::Argv(argv) => argv,
    };
    Ok(Some(argv))
}

/// environment をマップ形式と "KEY=VAL" リスト形式の両方で受け付ける
fn de_environment<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum EnvRepr {
        Map(HashMap<String, String>),
        List(Vec<String>),
    }

    match EnvRepr::deserialize(deserializer)? {
        EnvRepr::Map(map) => Ok(map),
        EnvRepr::List(entries) => {
            let mut map = HashMap::with_capacity(entries.len());
            for entry in entries {
                match entry.split_once('=') {
                    Some((key, value)) => {
                        map.insert(key.to_string(), value.to_string());
                    }
                    // 値なしのエントリはホスト環境から引き継ぐ
                    None => {
                        let value = std::env::var(&entry).unwrap_or_default();
                        map.insert(entry, value);
                    }
                }
            }
            Ok(map)
        }
    }
}

/// 単一文字列とリストの両方を受け付ける
fn de_string_or_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let values = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(list) => list,
    };
    Ok(values.into_iter().map(T::from).collect())
}
