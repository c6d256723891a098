//! IdGenerator port - ID 生成の抽象化
//!
//! ハンドラが新しいエンティティに ID を割り当てるときに使います。
//! テスト容易性のために trait として抽象化しています。

use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は ULID を払い出す
///
/// 型付きの ID は `Id::<T>::generate(&ids)` で取得します。
pub trait IdGenerator: Send + Sync {
    fn next_ulid(&self) -> Ulid;
}

/// UlidGenerator は Clock の現在時刻ベースで ULID を生成
///
/// FixedClock を渡すと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}
