// テストバイナリごとにコンパイルされるため、片方でしか使わない
// ヘルパーは未使用警告になる
#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// テスト用の一時プロジェクトディレクトリ
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// caravel.yml を持つプロジェクトを作成
    pub fn new(descriptor_yaml: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        fs::write(dir.path().join("caravel.yml"), descriptor_yaml)
            .expect("failed to write caravel.yml");
        Self { dir }
    }

    /// 記述ファイルなしの空ディレクトリ
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// プロジェクト内にファイルを追加
    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.dir.path().join(name), content).expect("failed to write file");
    }

    /// プロジェクトルートをカレントディレクトリとしてcaravelを実行
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("caravel").expect("binary not built");
        cmd.current_dir(self.dir.path());
        // 環境からの設定パス上書きはテストを汚染するため除去
        cmd.env_remove("CARAVEL_CONFIG_PATH");
        cmd
    }
}
