//! バインドマウント定義

use crate::error::DescriptorError;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// バインドマウント
///
/// ホスト側のパスをコンテナ内に公開する。永続化（DBデータ）と
/// 設定ファイル注入（redis.conf等）の両方に使われる。
/// ホスト側のファイルシステムが常に正となり、teardown でも削除されない。
///
/// ```yaml
/// volumes:
///   - "./postgres:/var/lib/postgresql/data"
///   - "./redis.conf:/usr/local/etc/redis/redis.conf:ro"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BindMount {
    pub host: PathBuf,
    pub container: PathBuf,
    pub read_only: bool,
}

impl FromStr for BindMount {
    type Err = DescriptorError;

    /// `HOST:CONTAINER[:ro|rw]` 形式をパース
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DescriptorError::InvalidVolume(s.to_string());

        let parts: Vec<&str> = s.split(':').collect();
        let (host, container, mode) = match parts.as_slice() {
            [host, container] => (*host, *container, "rw"),
            [host, container, mode] => (*host, *container, *mode),
            _ => return Err(invalid()),
        };

        if host.is_empty() || container.is_empty() {
            return Err(invalid());
        }

        let read_only = match mode {
            "rw" => false,
            "ro" => true,
            _ => return Err(invalid()),
        };

        Ok(BindMount {
            host: PathBuf::from(host),
            container: PathBuf::from(container),
            read_only,
        })
    }
}

impl fmt::Display for BindMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container.display())?;
        if self.read_only {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

impl Serialize for BindMount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BindMount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
