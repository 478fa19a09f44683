//! モデル定義
//!
//! Caravelで使用されるデータモデルを定義します。
//! 各モデルは機能ごとにモジュールに分離されています。

mod descriptor;
mod port;
mod service;
mod volume;

// Re-exports
pub use descriptor::*;
pub use port::*;
pub use service::*;
pub use volume::*;
