//! 統合ローダー
//!
//! YAMLのパース、ローカルオーバーライドのマージ、env_fileの展開、
//! ロード時バリデーションを統合します。

use crate::error::{DescriptorError, Result};
use crate::model::{Descriptor, DescriptorFile, Service};
use crate::validate::validate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// メインの記述ファイル名
pub const DESCRIPTOR_FILE: &str = "caravel.yml";
/// ローカルオーバーライドのファイル名（gitignore想定）
pub const LOCAL_OVERRIDE_FILE: &str = "caravel.local.yml";

/// 発見された記述ファイルのパスからプロジェクトをロード
///
/// ファイル名によって何とマージするかが決まる:
/// - `caravel.yml`: 同じディレクトリに caravel.local.yml があれば
///   サービス単位でマージ
/// - `caravel.local.yml`: 同じディレクトリの caravel.yml をベースに
///   読み、その上にマージ（ベースがなければ単体でロード）
/// - それ以外（CARAVEL_CONFIG_PATH による任意の指定）: そのファイル
///   単体をロード。オーバーライドは探さない
///
/// その後 env_file の展開（明示的な environment が優先）と
/// バリデーション（依存参照・循環・ポート重複・image/build）を実行。
/// プロジェクトルートは記述ファイルの親ディレクトリになる。
#[instrument(skip(descriptor_path), fields(descriptor = %descriptor_path.display()))]
pub fn load_project_from_file(descriptor_path: &Path) -> Result<Descriptor> {
    info!("Starting project load");

    let project_root = descriptor_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let project_root = project_root.as_path();

    let file_name = descriptor_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DESCRIPTOR_FILE);

    let file = if file_name == LOCAL_OVERRIDE_FILE {
        // 発見がローカルオーバーライドを返すのは caravel.yml より
        // 優先されるため。ベースがあればそれを起点にマージする
        let base_path = project_root.join(DESCRIPTOR_FILE);
        if base_path.exists() {
            let mut base = read_descriptor_file(&base_path)?;
            debug!("Merging local override: {}", descriptor_path.display());
            merge_local_override(&mut base, read_descriptor_file(descriptor_path)?);
            base
        } else {
            read_descriptor_file(descriptor_path)?
        }
    } else {
        let mut base = read_descriptor_file(descriptor_path)?;
        if file_name == DESCRIPTOR_FILE {
            let override_path = project_root.join(LOCAL_OVERRIDE_FILE);
            if override_path.exists() {
                debug!("Merging local override: {}", override_path.display());
                merge_local_override(&mut base, read_descriptor_file(&override_path)?);
            }
        }
        base
    };

    // プロジェクト名: name キー → ディレクトリ名の順でフォールバック
    let name = file.name.unwrap_or_else(|| {
        project_root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string()
    });

    let mut descriptor = Descriptor {
        name,
        services: file.services,
    };

    // env_file の展開
    for service in descriptor.services.values_mut() {
        expand_env_files(service, project_root)?;
    }

    validate(&descriptor)?;

    info!(
        services = descriptor.services.len(),
        "Project loaded successfully"
    );

    Ok(descriptor)
}

fn read_descriptor_file(path: &Path) -> Result<DescriptorFile> {
    let content = std::fs::read_to_string(path).map_err(|e| DescriptorError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(serde_yaml::from_str(&content)?)
}

/// オーバーライドをサービス単位でベースにマージする
fn merge_local_override(base: &mut DescriptorFile, overlay: DescriptorFile) {
    if overlay.name.is_some() {
        base.name = overlay.name;
    }
    for (name, service) in overlay.services {
        match base.services.get_mut(&name) {
            Some(existing) => existing.merge(service),
            None => {
                base.services.insert(name, service);
            }
        }
    }
}

/// env_file を読み込んで environment にマージする
///
/// ファイル内容は不透明な外部入力として扱い、KEY=VAL の形だけを解釈する。
/// 明示的な environment のエントリが常に優先される。
fn expand_env_files(service: &mut Service, project_root: &Path) -> Result<()> {
    if service.env_file.is_empty() {
        return Ok(());
    }

    let mut merged: HashMap<String, String> = HashMap::new();
    for env_file in &service.env_file {
        let path = if env_file.is_relative() {
            project_root.join(env_file)
        } else {
            env_file.clone()
        };
        let vars = parse_env_file(&path)?;
        merged.extend(vars);
    }

    // 明示的な environment が env_file を上書き
    for (key, value) in service.environment.drain() {
        merged.insert(key, value);
    }
    service.environment = merged;

    Ok(())
}

/// dotenv形式のファイルをパースする
///
/// `KEY=VALUE` の行のみ解釈。空行と `#` コメントは無視。
/// 値の前後のダブル／シングルクォートは剥がす。
pub fn parse_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|e| DescriptorError::EnvFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut vars = HashMap::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(DescriptorError::EnvFile {
                path: path.to_path_buf(),
                message: format!("{}行目: KEY=VALUE 形式ではありません: {}", line_no + 1, line),
            });
        };

        let key = key.trim();
        let value = strip_quotes(value.trim());
        if key.is_empty() {
            return Err(DescriptorError::EnvFile {
                path: path.to_path_buf(),
                message: format!("{}行目: キーが空です", line_no + 1),
            });
        }
        vars.insert(key.to_string(), value.to_string());
    }

    Ok(vars)
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}
