//! ポートマッピング定義

use crate::error::DescriptorError;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ポートマッピング
///
/// 記述ファイルでは compose 互換の短縮形式で指定する：
/// ```yaml
/// ports:
///   - "8000:8000"
///   - "127.0.0.1:5432:5432"
///   - "53:53/udp"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
    pub protocol: Protocol,
    pub host_ip: Option<String>,
}

/// プロトコル種別
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    /// 文字列からProtocolをパース
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "udp" => Protocol::Udp,
            _ => Protocol::Tcp,
        }
    }

    /// Docker APIで使用する文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl FromStr for PortMapping {
    type Err = DescriptorError;

    /// `[IP:]HOST:CONTAINER[/proto]` 形式をパース
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DescriptorError::InvalidPort(s.to_string());

        let (spec, protocol) = match s.split_once('/') {
            Some((spec, proto)) => (spec, Protocol::parse(proto)),
            None => (s, Protocol::Tcp),
        };

        let parts: Vec<&str> = spec.split(':').collect();
        let (host_ip, host_str, container_str) = match parts.as_slice() {
            [host, container] => (None, *host, *container),
            [ip, host, container] => (Some(ip.to_string()), *host, *container),
            _ => return Err(invalid()),
        };

        let host: u16 = host_str.trim().parse().map_err(|_| invalid())?;
        let container: u16 = container_str.trim().parse().map_err(|_| invalid())?;

        Ok(PortMapping {
            host,
            container,
            protocol,
            host_ip,
        })
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ip) = &self.host_ip {
            write!(f, "{}:", ip)?;
        }
        write!(f, "{}:{}", self.host, self.container)?;
        if self.protocol == Protocol::Udp {
            write!(f, "/udp")?;
        }
        Ok(())
    }
}

// YAMLでは短縮文字列としてシリアライズ／デシリアライズする
impl Serialize for PortMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PortMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
