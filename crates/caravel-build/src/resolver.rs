use crate::error::{BuildError, Result};
use caravel_core::Service;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct BuildResolver {
    project_root: PathBuf,
}

impl BuildResolver {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// ビルドコンテキストのパスを解決
    ///
    /// build が git URL の場合は None（リモートコンテキスト）。
    /// 相対パスはプロジェクトルート基準。
    pub fn resolve_context(&self, service: &Service) -> Result<Option<PathBuf>> {
        let Some(build) = &service.build else {
            return Err(BuildError::InvalidConfig(
                "サービスに build 設定がありません".to_string(),
            ));
        };

        if build.git_url().is_some() {
            return Ok(None);
        }

        let context = match build.context() {
            Some(ctx) if ctx.is_relative() => self.project_root.join(ctx),
            Some(ctx) => ctx,
            None => self.project_root.clone(),
        };

        // コンテキストディレクトリの存在確認
        if !context.exists() {
            return Err(BuildError::ContextNotFound(context));
        }

        if !context.is_dir() {
            return Err(BuildError::InvalidConfig(format!(
                "Build context is not a directory: {}",
                context.display()
            )));
        }

        Ok(Some(context))
    }

    /// Dockerfileのパスを解決
    ///
    /// 検索順序:
    /// 1. 明示的な指定（build.dockerfile、コンテキスト基準）
    /// 2. 規約ベース:
    ///    - {context}/Dockerfile
    ///    - {project_root}/Dockerfile.{service-name}
    pub fn resolve_dockerfile(
        &self,
        service_name: &str,
        service: &Service,
        context: &Path,
    ) -> Result<PathBuf> {
        // 明示的な指定がある場合
        if let Some(build) = &service.build {
            if let Some(dockerfile) = build.dockerfile() {
                let path = if dockerfile.is_relative() {
                    context.join(dockerfile)
                } else {
                    dockerfile.clone()
                };
                if path.exists() {
                    return Ok(path);
                }
                return Err(BuildError::DockerfileNotFound(path));
            }
        }

        // 規約ベースの検索
        let candidates = vec![
            context.join("Dockerfile"),
            self.project_root.join(format!("Dockerfile.{}", service_name)),
        ];

        for candidate in candidates {
            if candidate.exists() {
                tracing::debug!(
                    "Found Dockerfile for service '{}' at: {}",
                    service_name,
                    candidate.display()
                );
                return Ok(candidate);
            }
        }

        Err(BuildError::DockerfileNotFound(context.join("Dockerfile")))
    }

    /// ビルド引数の変数展開
    pub fn resolve_build_args(
        &self,
        service: &Service,
        variables: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        let mut resolved_args = HashMap::new();

        if let Some(build) = &service.build {
            for (key, value) in &build.args() {
                // 変数展開: {VAR_NAME} → 実際の値
                let resolved_value = self.expand_variables(value, variables);
                resolved_args.insert(key.clone(), resolved_value);
            }
        }

        resolved_args
    }

    /// 変数展開処理
    ///
    /// テンプレート文字列内の {VAR_NAME} を実際の値に置換
    fn expand_variables(&self, template: &str, variables: &HashMap<String, String>) -> String {
        let mut result = template.to_string();

        for (key, value) in variables {
            let placeholder = format!("{{{}}}", key);
            result = result.replace(&placeholder, value);
        }

        result
    }
}
