//! Descriptor から Docker API パラメータへの変換

// Bollard 0.19 の非推奨APIを一時的に使用
#![allow(deprecated)]

use bollard::container::{Config, CreateContainerOptions, NetworkingConfig};
use bollard::models::{
    EndpointSettings, HostConfig, PortBinding, RestartPolicy as DockerRestartPolicy,
    RestartPolicyNameEnum,
};
use caravel_core::{RestartPolicy, Service};
use std::collections::HashMap;
use std::path::Path;

/// プロジェクトのブリッジネットワーク名を生成
pub fn network_name(project_name: &str) -> String {
    format!("{}-default", project_name)
}

/// コンテナ名を決定
///
/// container_name による明示指定が優先され、なければ
/// {project}-{service} の命名規則を使う。
pub fn container_name(project_name: &str, service_name: &str, service: &Service) -> String {
    service
        .container_name
        .clone()
        .unwrap_or_else(|| format!("{}-{}", project_name, service_name))
}

/// サービスが使用するイメージ名を解決
///
/// 1. imageにタグが含まれている場合はそのまま使用
/// 2. imageのみでタグがない場合は "image:latest"
/// 3. imageがなくbuild設定がある場合は "{project}-{service}:latest"
///    （ビルド時に同じタグが付与される）
///
/// レジストリのポート区切り（localhost:5000/app）はタグとは
/// 見なさない: タグは最後の ":" 以降に "/" を含まない場合のみ。
pub fn resolve_image_name(service_name: &str, service: &Service, project_name: &str) -> String {
    match &service.image {
        Some(img) => match img.rsplit_once(':') {
            Some((_, tag)) if !tag.contains('/') => img.clone(),
            _ => format!("{}:latest", img),
        },
        None => format!("{}-{}:latest", project_name, service_name),
    }
}

/// 再起動ポリシーを Docker API の表現に変換
fn to_docker_restart_policy(policy: RestartPolicy) -> DockerRestartPolicy {
    let name = match policy {
        RestartPolicy::No => RestartPolicyNameEnum::NO,
        RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
        RestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
        RestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
    };
    DockerRestartPolicy {
        name: Some(name),
        maximum_retry_count: None,
    }
}

/// ServiceをDockerのコンテナ設定に変換
///
/// 相対パスのバインドマウントはプロジェクトルート基準で絶対パスに
/// 解決される。再起動はランタイムのrestart policyに委譲し、自前の
/// プロセス監視は行わない。
pub fn service_to_container_config(
    service_name: &str,
    service: &Service,
    project_name: &str,
    project_root: &Path,
) -> (Config<String>, CreateContainerOptions<String>) {
    let image = resolve_image_name(service_name, service, project_name);

    // 環境変数の設定
    let env: Vec<String> = service
        .environment
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    // ポートバインディングの設定
    let mut port_bindings = HashMap::new();
    let mut exposed_ports = HashMap::new();

    for port in &service.ports {
        let container_port = format!("{}/{}", port.container, port.protocol.as_str());

        // ポート公開設定
        exposed_ports.insert(container_port.clone(), HashMap::new());

        // ホストポートバインディング
        let host_ip = port.host_ip.as_deref().unwrap_or("0.0.0.0");
        port_bindings.insert(
            container_port,
            Some(vec![PortBinding {
                host_ip: Some(host_ip.to_string()),
                host_port: Some(port.host.to_string()),
            }]),
        );
    }

    // バインドマウント
    // ホスト側ファイルシステムが正。相対パスはプロジェクトルート基準。
    let binds: Vec<String> = service
        .volumes
        .iter()
        .map(|v| {
            let mode = if v.read_only { "ro" } else { "rw" };
            let host_path = if v.host.is_relative() {
                project_root.join(&v.host)
            } else {
                v.host.clone()
            };
            format!("{}:{}:{}", host_path.display(), v.container.display(), mode)
        })
        .collect();

    let network = network_name(project_name);

    // HostConfig設定
    let host_config = Some(HostConfig {
        port_bindings: Some(port_bindings),
        binds: Some(binds),
        network_mode: Some(network.clone()),
        restart_policy: Some(to_docker_restart_policy(service.restart_policy())),
        privileged: Some(service.is_privileged()),
        ..Default::default()
    });

    // ラベル設定（composeツール互換のグループ化）
    let mut labels = HashMap::new();
    labels.insert(
        "com.docker.compose.project".to_string(),
        project_name.to_string(),
    );
    labels.insert(
        "com.docker.compose.service".to_string(),
        service_name.to_string(),
    );
    labels.insert("caravel.project".to_string(), project_name.to_string());
    labels.insert("caravel.service".to_string(), service_name.to_string());

    // ネットワーク設定（サービス名でエイリアス）
    let mut endpoints = HashMap::new();
    endpoints.insert(
        network,
        EndpointSettings {
            aliases: Some(vec![service_name.to_string()]),
            ..Default::default()
        },
    );
    let networking_config = Some(NetworkingConfig {
        endpoints_config: endpoints,
    });

    // コンテナ設定
    let config = Config {
        image: Some(image),
        env: Some(env),
        exposed_ports: Some(exposed_ports),
        host_config,
        labels: Some(labels),
        // 分割済みのargv（文字列形式の空白分割はパース時に行われる）
        cmd: service.command.clone(),
        networking_config,
        ..Default::default()
    };

    let options = CreateContainerOptions {
        name: container_name(project_name, service_name, service),
        platform: None,
    };

    (config, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_core::{BindMount, PortMapping, Service};

    fn convert(service_name: &str, service: &Service) -> (Config<String>, CreateContainerOptions<String>) {
        service_to_container_config(service_name, service, "0ataos", Path::new("/work/0ataos"))
    }

    #[test]
    fn test_basic_image_resolution() {
        let service = Service {
            image: Some("postgres:15.3".to_string()),
            ..Default::default()
        };

        let (config, options) = convert("postgres", &service);
        assert_eq!(config.image, Some("postgres:15.3".to_string()));
        assert_eq!(options.name, "0ataos-postgres");
    }

    #[test]
    fn test_image_without_tag_gets_latest() {
        let service = Service {
            image: Some("redis".to_string()),
            ..Default::default()
        };

        let (config, _) = convert("redis", &service);
        assert_eq!(config.image, Some("redis:latest".to_string()));
    }

    #[test]
    fn test_build_service_uses_project_tag() {
        let service: Service = serde_yaml::from_str("build: .").unwrap();
        let (config, _) = convert("backend", &service);
        assert_eq!(config.image, Some("0ataos-backend:latest".to_string()));
    }

    #[test]
    fn test_container_name_override() {
        let service = Service {
            image: Some("postgres:15.3".to_string()),
            container_name: Some("0ataos-db".to_string()),
            ..Default::default()
        };

        let (_, options) = convert("postgres", &service);
        assert_eq!(options.name, "0ataos-db");
    }

    #[test]
    fn test_environment() {
        let mut service = Service {
            image: Some("backend".to_string()),
            ..Default::default()
        };
        service
            .environment
            .insert("DEBUG".to_string(), "True".to_string());

        let (config, _) = convert("backend", &service);
        let env = config.env.unwrap();
        assert!(env.contains(&"DEBUG=True".to_string()));
    }

    #[test]
    fn test_port_bindings() {
        let service = Service {
            image: Some("backend".to_string()),
            ports: vec![
                "8000:8000".parse::<PortMapping>().unwrap(),
                "127.0.0.1:5432:5432".parse::<PortMapping>().unwrap(),
            ],
            ..Default::default()
        };

        let (config, _) = convert("backend", &service);

        let exposed_ports = config.exposed_ports.unwrap();
        assert!(exposed_ports.contains_key("8000/tcp"));
        assert!(exposed_ports.contains_key("5432/tcp"));

        let host_config = config.host_config.unwrap();
        let port_bindings = host_config.port_bindings.unwrap();

        let binding_8000 = port_bindings.get("8000/tcp").unwrap().as_ref().unwrap();
        assert_eq!(binding_8000[0].host_port, Some("8000".to_string()));
        assert_eq!(binding_8000[0].host_ip, Some("0.0.0.0".to_string()));

        let binding_5432 = port_bindings.get("5432/tcp").unwrap().as_ref().unwrap();
        assert_eq!(binding_5432[0].host_ip, Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_relative_bind_resolved_against_project_root() {
        let service = Service {
            image: Some("postgres:15.3".to_string()),
            volumes: vec!["./postgres:/var/lib/postgresql/data"
                .parse::<BindMount>()
                .unwrap()],
            ..Default::default()
        };

        let (config, _) = convert("postgres", &service);
        let binds = config.host_config.unwrap().binds.unwrap();
        assert_eq!(
            binds[0],
            "/work/0ataos/./postgres:/var/lib/postgresql/data:rw"
        );
    }

    #[test]
    fn test_absolute_bind_kept_as_is() {
        let service = Service {
            image: Some("helper".to_string()),
            volumes: vec!["/proc/sys/vm:/mnt/vm".parse::<BindMount>().unwrap()],
            ..Default::default()
        };

        let (config, _) = convert("redis-overcommit", &service);
        let binds = config.host_config.unwrap().binds.unwrap();
        assert_eq!(binds[0], "/proc/sys/vm:/mnt/vm:rw");
    }

    #[test]
    fn test_read_only_bind() {
        let service = Service {
            image: Some("redis:latest".to_string()),
            volumes: vec!["/etc/redis.conf:/usr/local/etc/redis/redis.conf:ro"
                .parse::<BindMount>()
                .unwrap()],
            ..Default::default()
        };

        let (config, _) = convert("redis", &service);
        let binds = config.host_config.unwrap().binds.unwrap();
        assert!(binds[0].ends_with(":ro"));
    }

    #[test]
    fn test_restart_policy_forwarded_to_runtime() {
        let service: Service =
            serde_yaml::from_str("image: redis:latest\nrestart: always").unwrap();
        let (config, _) = convert("redis", &service);

        let policy = config.host_config.unwrap().restart_policy.unwrap();
        assert_eq!(policy.name, Some(RestartPolicyNameEnum::ALWAYS));
    }

    #[test]
    fn test_restart_policy_default_no() {
        // restart 未指定のワンショットヘルパーは二度と再起動されない
        let service = Service {
            image: Some("helper".to_string()),
            ..Default::default()
        };
        let (config, _) = convert("redis-overcommit", &service);

        let policy = config.host_config.unwrap().restart_policy.unwrap();
        assert_eq!(policy.name, Some(RestartPolicyNameEnum::NO));
    }

    #[test]
    fn test_privileged_flag() {
        let service: Service =
            serde_yaml::from_str("image: helper\nprivileged: true").unwrap();
        let (config, _) = convert("redis-overcommit", &service);

        assert_eq!(config.host_config.unwrap().privileged, Some(true));
    }

    #[test]
    fn test_command_string_form() {
        let service: Service = serde_yaml::from_str(
            "image: backend\ncommand: \"uvicorn main:app --reload --host 0.0.0.0\"",
        )
        .unwrap();

        let (config, _) = convert("backend", &service);
        let cmd = config.cmd.unwrap();
        assert_eq!(cmd, vec!["uvicorn", "main:app", "--reload", "--host", "0.0.0.0"]);
    }

    #[test]
    fn test_command_list_form_quoted_argument() {
        let service: Service = serde_yaml::from_str(
            "image: redis:latest\ncommand:\n  - sh\n  - -c\n  - \"redis-server --save ''\"",
        )
        .unwrap();

        let (config, _) = convert("redis", &service);
        let cmd = config.cmd.unwrap();
        assert_eq!(cmd, vec!["sh", "-c", "redis-server --save ''"]);
    }

    #[test]
    fn test_labels_and_network_alias() {
        let service = Service {
            image: Some("redis:latest".to_string()),
            ..Default::default()
        };

        let (config, _) = convert("redis", &service);

        let labels = config.labels.unwrap();
        assert_eq!(
            labels.get("com.docker.compose.project"),
            Some(&"0ataos".to_string())
        );
        assert_eq!(labels.get("caravel.service"), Some(&"redis".to_string()));
        assert_eq!(labels.len(), 4);

        let networking = config.networking_config.unwrap();
        let endpoint = networking.endpoints_config.get("0ataos-default").unwrap();
        assert_eq!(endpoint.aliases, Some(vec!["redis".to_string()]));
    }

    #[test]
    fn test_network_name_format() {
        assert_eq!(network_name("0ataos"), "0ataos-default");
    }

    #[test]
    fn test_resolve_image_name_for_build_service() {
        let service = Service::default();
        assert_eq!(
            resolve_image_name("backend", &service, "myproject"),
            "myproject-backend:latest"
        );
    }

    #[test]
    fn test_resolve_image_name_registry_port() {
        // レジストリのポート番号はタグではない
        let service = Service {
            image: Some("localhost:5000/app".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_image_name("app", &service, "demo"),
            "localhost:5000/app:latest"
        );

        let service = Service {
            image: Some("localhost:5000/app:dev".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_image_name("app", &service, "demo"),
            "localhost:5000/app:dev"
        );
    }
}
