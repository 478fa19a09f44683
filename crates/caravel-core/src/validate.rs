//! ロード時バリデーション
//!
//! Docker に触れる前に記述ファイル単体で検証できる静的な制約を
//! すべてここで検査する。

use crate::error::{DescriptorError, Result};
use crate::graph;
use crate::model::Descriptor;
use std::collections::HashMap;

/// Descriptor全体を検証する
///
/// 検査項目:
/// 1. depends_on の参照先が同じ記述ファイル内に定義されていること
/// 2. 依存グラフが非循環であること
/// 3. ホストポートがサービスごとに一意であること
/// 4. 各サービスに image または build のどちらかがあること
pub fn validate(descriptor: &Descriptor) -> Result<()> {
    // 1と2はトポロジカルソートが検出する
    graph::start_order(descriptor)?;

    check_host_ports_unique(descriptor)?;

    for name in descriptor.service_names() {
        let service = &descriptor.services[name];
        if service.image.is_none() && service.build.is_none() {
            return Err(DescriptorError::MissingImage(name.to_string()));
        }
    }

    Ok(())
}

/// ホストポートの重複を検出する
///
/// ホストポートは (IP, ポート番号, プロトコル) の単位で排他的に
/// 占有されるため、同じ記述ファイル内での重複宣言は適用前に
/// 失敗させる。tcp と udp の同番ポートは両立する。IP 未指定は
/// 0.0.0.0 のワイルドカードで、同番・同プロトコルのあらゆる
/// IP 指定と衝突する。
fn check_host_ports_unique(descriptor: &Descriptor) -> Result<()> {
    // (ポート番号, プロトコル) -> 占有している (IP, サービス名)
    let mut claimed: HashMap<(u16, &str), Vec<(&str, &str)>> = HashMap::new();

    for name in descriptor.service_names() {
        let service = &descriptor.services[name];
        for port in &service.ports {
            let ip = port.host_ip.as_deref().unwrap_or("0.0.0.0");
            let entries = claimed
                .entry((port.host, port.protocol.as_str()))
                .or_default();

            let conflict = entries
                .iter()
                .find(|(held, _)| *held == ip || *held == "0.0.0.0" || ip == "0.0.0.0");
            if let Some((_, first)) = conflict {
                return Err(DescriptorError::DuplicateHostPort {
                    port: port.host,
                    first: first.to_string(),
                    second: name.to_string(),
                });
            }
            entries.push((ip, name));
        }
    }

    Ok(())
}
