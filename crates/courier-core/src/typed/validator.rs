//! Validator - リクエスト型ごとの入力検証
//!
//! # 学習ポイント
//! - 1 つのリクエスト型に複数の Validator を登録できる（順序は登録順で安定）
//! - Validator はリクエストを `&R` で受け取るだけで、変更しない
//! - 「報告された検証失敗」（Ok(failures)）と「実行時の故障」（Err）を区別する
//!
//! 検証はリクエスト型ごとのオプトインです。未登録なら空の列が返ります。

use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{DispatchError, Request, RequestDescriptor, ValidationFailure};

/// A validator crashed instead of reporting failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validator fault: {0}")]
pub struct ValidatorError(pub String);

impl From<ValidatorError> for DispatchError {
    fn from(err: ValidatorError) -> Self {
        DispatchError::unexpected(err)
    }
}

/// Validator は Request を検査して field 単位の失敗を報告する
///
/// 失敗がなければ空の Vec を返します。
#[async_trait]
pub trait Validator<R: Request>: Send + Sync {
    async fn validate(&self, request: &R) -> Result<Vec<ValidationFailure>, ValidatorError>;
}

type Predicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

struct Rule<R> {
    field: &'static str,
    message: String,
    passes: Predicate<R>,
}

/// RuleValidator は宣言的なルールの列で検証する
///
/// ルールは宣言順に評価され、失敗したルールがその順で報告されます。
///
/// # 使用例
/// ```ignore
/// let validator = RuleValidator::<CreateProduct>::new()
///     .rule("name", "Name is required", |c| !c.name.trim().is_empty())
///     .rule("price", "Price must be greater than 0", |c| c.price > 0.0);
/// ```
pub struct RuleValidator<R> {
    rules: Vec<Rule<R>>,
}

impl<R: Request> RuleValidator<R> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// `passes` が false を返すと `{field, message}` を報告する
    pub fn rule<F>(mut self, field: &'static str, message: impl Into<String>, passes: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            field,
            message: message.into(),
            passes: Box::new(passes),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<R: Request> Default for RuleValidator<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Request> Validator<R> for RuleValidator<R> {
    async fn validate(&self, request: &R) -> Result<Vec<ValidationFailure>, ValidatorError> {
        Ok(self
            .rules
            .iter()
            .filter(|rule| !(rule.passes)(request))
            .map(|rule| ValidationFailure::new(rule.field, rule.message.clone()))
            .collect())
    }
}

/// `Vec<Arc<dyn Validator<R>>>` behind `dyn Any`.
struct ValidatorList {
    descriptor: RequestDescriptor,
    validators: Box<dyn Any + Send + Sync>,
}

/// ValidatorSet はリクエスト型ごとの Validator 列を管理
///
/// 起動時に構築され、その後は参照のみです。
#[derive(Default)]
pub struct ValidatorSet {
    lists: HashMap<TypeId, ValidatorList>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録順に追加する
    pub fn register<R, V>(&mut self, validator: V)
    where
        R: Request,
        V: Validator<R> + 'static,
    {
        let descriptor = RequestDescriptor::of::<R>();
        let list = self.lists.entry(descriptor.type_id).or_insert_with(|| ValidatorList {
            descriptor,
            validators: Box::new(Vec::<Arc<dyn Validator<R>>>::new()),
        });
        if let Some(validators) = list.validators.downcast_mut::<Vec<Arc<dyn Validator<R>>>>() {
            validators.push(Arc::new(validator));
        }
    }

    /// 未登録なら空の列（失敗ではない）
    pub fn validators_for<R: Request>(&self) -> Vec<Arc<dyn Validator<R>>> {
        self.lists
            .get(&TypeId::of::<R>())
            .and_then(|list| list.validators.downcast_ref::<Vec<Arc<dyn Validator<R>>>>())
            .cloned()
            .unwrap_or_default()
    }

    /// Request types that have at least one validator.
    pub fn request_types(&self) -> Vec<RequestDescriptor> {
        self.lists.values().map(|list| list.descriptor).collect()
    }
}
