//! App - アプリケーション層
//!
//! このモジュールは、typed の登録内容と behaviors を組み合わせて Mediator を構築します。
//!
//! # 主要コンポーネント
//! - **MediatorConfig**: behavior の並びと dispatch タイムアウト（JSON で読める）
//! - **MediatorBuilder**: 登録と起動時検証（Fail-fast）
//! - **Pipeline**: リクエスト型ごとに組み立て済みの behavior チェーン
//! - **Mediator**: dispatch 入口

pub mod builder;
pub mod config;
pub mod mediator;
pub mod pipeline;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, MediatorBuilder};
pub use self::config::{BehaviorKind, ConfigError, MediatorConfig};
pub use self::mediator::Mediator;
pub use self::pipeline::Pipeline;
