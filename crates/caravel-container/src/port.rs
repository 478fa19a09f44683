//! ホストポートの占有状況チェック
//!
//! ホストポートは排他的に占有される。apply 時に既に使用中なら
//! そのサービスの起動は失敗させる（自動解放や強制終了はしない）。

use caravel_core::Descriptor;
use std::process::Command;
use tracing::debug;

/// 指定されたポートを使用しているプロセスの PID を取得する
pub fn find_pids_by_port(port: u16) -> Vec<i32> {
    // lsof -ti:{port} を実行
    let output = Command::new("lsof")
        .arg("-t")
        .arg(format!("-i:{}", port))
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let pids_str = String::from_utf8_lossy(&out.stdout);
            pids_str
                .lines()
                .filter_map(|line| line.trim().parse::<i32>().ok())
                .collect()
        }
        // lsof が使えない環境ではチェックをスキップ（バインド時に判明する）
        _ => vec![],
    }
}

/// Descriptorが宣言するホストポートのうち既に占有されているものを返す
///
/// 事前チェック用。競合してもここでは失敗させず、占有ポートと
/// 占有プロセスのPIDを報告する。
pub fn occupied_host_ports(descriptor: &Descriptor) -> Vec<(u16, Vec<i32>)> {
    let mut occupied = Vec::new();

    for name in descriptor.service_names() {
        let service = &descriptor.services[name];
        for port in &service.ports {
            let pids = find_pids_by_port(port.host);
            if !pids.is_empty() {
                debug!(port = port.host, ?pids, "Host port already occupied");
                occupied.push((port.host, pids));
            }
        }
    }

    occupied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lsof_missing_is_not_fatal() {
        // lsof がない環境でも panic せず「占有なし」として扱われること
        let _ = find_pids_by_port(65000);
    }
}
