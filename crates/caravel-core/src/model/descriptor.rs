//! 記述ファイル全体の定義

use super::service::Service;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Descriptor - 環境の設計図
///
/// サービス名から構造化されたサービス定義へのマップ。
/// apply時に生成され、teardown時に破棄されるインフラリソースのみを
/// 記述する。アプリケーションのデータモデルは持たない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    /// プロジェクト名（コンテナ名・ネットワーク名の接頭辞）
    pub name: String,
    /// このDescriptorで定義されるサービス
    pub services: HashMap<String, Service>,
}

/// YAMLファイルそのままの形
///
/// name はファイル内で省略可能で、その場合プロジェクトルートの
/// ディレクトリ名が使われる。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorFile {
    pub name: Option<String>,
    #[serde(default)]
    pub services: HashMap<String, Service>,
}

impl Descriptor {
    /// サービス定義を取得（存在しなければエラー）
    pub fn service(&self, name: &str) -> crate::error::Result<&Service> {
        self.services
            .get(name)
            .ok_or_else(|| crate::error::DescriptorError::ServiceNotFound(name.to_string()))
    }

    /// 名前順のサービス一覧（表示用に決定的な順序）
    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
