//! 依存グラフの解決
//!
//! depends_on のエッジに対する明示的なトポロジカルソート。
//! 暗黙的な起動順序の解決はせず、循環とダングリング参照は
//! ロード時に即座にエラーとする。

use crate::error::{DescriptorError, Result};
use crate::model::Descriptor;
use std::collections::{HashMap, HashSet};

/// 起動順序を計算する
///
/// 返り値の順序は「依存されるサービスが先」。同じ深さのサービスは
/// 名前順になるため、結果は決定的。
///
/// depends_on は「起動コマンドが発行された後」を保証するだけで、
/// 準備完了（readiness）を待つものではない。
pub fn start_order(descriptor: &Descriptor) -> Result<Vec<String>> {
    // ダングリング参照の検出を先に行う
    for (name, service) in &descriptor.services {
        for dep in &service.depends_on {
            if !descriptor.services.contains_key(dep) {
                return Err(DescriptorError::UnknownDependency {
                    service: name.clone(),
                    target: dep.clone(),
                });
            }
        }
    }

    let mut order = Vec::with_capacity(descriptor.services.len());
    let mut state: HashMap<&str, VisitState> = HashMap::new();

    let mut names: Vec<&str> = descriptor.services.keys().map(|s| s.as_str()).collect();
    names.sort_unstable();

    for name in names {
        visit(descriptor, name, &mut state, &mut Vec::new(), &mut order)?;
    }

    Ok(order)
}

/// 停止順序を計算する（起動順序の逆）
pub fn stop_order(descriptor: &Descriptor) -> Result<Vec<String>> {
    let mut order = start_order(descriptor)?;
    order.reverse();
    Ok(order)
}

/// あるサービス集合に（推移的に）依存するサービスを求める
///
/// 起動失敗時に、失敗したサービスの依存先だけをスキップし、
/// 無関係な兄弟サービスは起動を続行するために使う。
pub fn transitive_dependents(
    descriptor: &Descriptor,
    roots: &HashSet<String>,
) -> HashSet<String> {
    let mut dependents: HashSet<String> = HashSet::new();
    // 依存辺が少ないため固定点まで単純に反復する
    loop {
        let mut changed = false;
        for (name, service) in &descriptor.services {
            if dependents.contains(name) || roots.contains(name) {
                continue;
            }
            let blocked = service
                .depends_on
                .iter()
                .any(|dep| roots.contains(dep) || dependents.contains(dep));
            if blocked {
                dependents.insert(name.clone());
                changed = true;
            }
        }
        if !changed {
            return dependents;
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    InProgress,
    Done,
}

fn visit<'a>(
    descriptor: &'a Descriptor,
    name: &'a str,
    state: &mut HashMap<&'a str, VisitState>,
    stack: &mut Vec<&'a str>,
    order: &mut Vec<String>,
) -> Result<()> {
    match state.get(name) {
        Some(VisitState::Done) => return Ok(()),
        Some(VisitState::InProgress) => {
            // 循環を stack からパスとして復元する
            let start = stack.iter().position(|s| *s == name).unwrap_or(0);
            let mut path: Vec<&str> = stack[start..].to_vec();
            path.push(name);
            return Err(DescriptorError::CircularDependency(path.join(" -> ")));
        }
        None => {}
    }

    state.insert(name, VisitState::InProgress);
    stack.push(name);

    let service = &descriptor.services[name];
    let mut deps: Vec<&str> = service.depends_on.iter().map(|s| s.as_str()).collect();
    deps.sort_unstable();
    for dep in deps {
        visit(descriptor, dep, state, stack, order)?;
    }

    stack.pop();
    state.insert(name, VisitState::Done);
    order.push(name.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Service;
    use std::collections::HashMap;

    fn descriptor(edges: &[(&str, &[&str])]) -> Descriptor {
        let mut services = HashMap::new();
        for (name, deps) in edges {
            services.insert(
                name.to_string(),
                Service {
                    image: Some(format!("{}:latest", name)),
                    depends_on: deps.iter().map(|d| d.to_string()).collect(),
                    ..Default::default()
                },
            );
        }
        Descriptor {
            name: "test".to_string(),
            services,
        }
    }

    #[test]
    fn test_start_order_respects_dependencies() {
        // overcommit helper -> redis -> backend、postgres は独立
        let descriptor = descriptor(&[
            ("backend", &["redis"]),
            ("redis", &["redis-overcommit"]),
            ("redis-overcommit", &[]),
            ("postgres", &[]),
        ]);

        let order = start_order(&descriptor).unwrap();
        let pos = |name: &str| order.iter().position(|s| s == name).unwrap();

        assert_eq!(order.len(), 4);
        assert!(pos("redis-overcommit") < pos("redis"));
        assert!(pos("redis") < pos("backend"));
    }

    #[test]
    fn test_start_order_deterministic() {
        let descriptor = descriptor(&[("a", &[]), ("b", &[]), ("c", &[])]);
        assert_eq!(start_order(&descriptor).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_stop_order_is_reversed() {
        let descriptor = descriptor(&[("backend", &["redis"]), ("redis", &[])]);
        assert_eq!(stop_order(&descriptor).unwrap(), vec!["backend", "redis"]);
    }

    #[test]
    fn test_dangling_reference() {
        let descriptor = descriptor(&[("backend", &["redis"])]);
        let err = start_order(&descriptor).unwrap_err();
        match err {
            DescriptorError::UnknownDependency { service, target } => {
                assert_eq!(service, "backend");
                assert_eq!(target, "redis");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_detection() {
        let descriptor = descriptor(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let err = start_order(&descriptor).unwrap_err();
        match err {
            DescriptorError::CircularDependency(path) => {
                assert!(path.contains(" -> "));
                assert!(path.contains('a') && path.contains('b') && path.contains('c'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let descriptor = descriptor(&[("a", &["a"])]);
        assert!(matches!(
            start_order(&descriptor),
            Err(DescriptorError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_transitive_dependents() {
        let descriptor = descriptor(&[
            ("backend", &["redis"]),
            ("redis", &["redis-overcommit"]),
            ("redis-overcommit", &[]),
            ("postgres", &[]),
        ]);

        let mut failed = HashSet::new();
        failed.insert("redis-overcommit".to_string());

        let blocked = transitive_dependents(&descriptor, &failed);
        assert!(blocked.contains("redis"));
        assert!(blocked.contains("backend"));
        // 独立した兄弟サービスは影響を受けない
        assert!(!blocked.contains("postgres"));
    }
}
