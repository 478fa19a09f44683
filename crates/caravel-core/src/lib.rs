//! Caravel core
//!
//! compose 互換のYAML記述ファイルを型付きモデルとしてロードし、
//! ロード時バリデーションと依存グラフの解決を提供します。
//! Docker API への変換は caravel-container が担当します。

pub mod error;
pub mod graph;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{DescriptorError, Result};
pub use graph::{start_order, stop_order, transitive_dependents};
pub use loader::{DESCRIPTOR_FILE, LOCAL_OVERRIDE_FILE, load_project_from_file, parse_env_file};
pub use model::*;
pub use validate::validate;
