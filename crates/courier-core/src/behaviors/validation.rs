//! ValidationBehavior - コマンドの入力検証ステージ
//!
//! # フロー
//! 1. リクエスト型に登録された Validator をすべて同時に実行（同じ `&R` を共有）
//! 2. キャンセルされたら待つのをやめて `Cancelled`
//! 3. 報告された失敗は登録順 → 各 Validator の報告順で連結
//! 4. 失敗が 1 件でもあれば `ValidationFailed`（Handler には渡さない）
//! 5. 空なら継続を呼び、その結果をそのまま返す
//!
//! Validator 自体の故障（Err や panic）は `UnexpectedFault` です。
//! 最初の故障で残りの Validator の結果は捨てられます。
//!
//! クエリには適用されません（composer がチェーンを組むときに除外します）。

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::try_join_all;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::domain::{DispatchError, Request, ValidationFailures};
use crate::typed::behavior::panic_message;
use crate::typed::{DispatchContext, Next, PipelineBehavior, Validator};

pub struct ValidationBehavior<R: Request> {
    validators: Vec<Arc<dyn Validator<R>>>,
}

impl<R: Request> ValidationBehavior<R> {
    pub fn new(validators: Vec<Arc<dyn Validator<R>>>) -> Self {
        Self { validators }
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    async fn collect_failures(&self, request: &R) -> Result<ValidationFailures, DispatchError> {
        let runs = self.validators.iter().enumerate().map(|(index, validator)| async move {
            match AssertUnwindSafe(validator.validate(request)).catch_unwind().await {
                Ok(Ok(reported)) => Ok(reported),
                Ok(Err(err)) => {
                    tracing::error!(request_type = R::NAME, validator = index, error = %err, "validator failed");
                    Err(DispatchError::from(err))
                }
                Err(panic) => {
                    let detail = panic_message(panic.as_ref());
                    tracing::error!(request_type = R::NAME, validator = index, panic = %detail, "validator panicked");
                    Err(DispatchError::unexpected(format!(
                        "validator #{index} for {} panicked: {detail}",
                        R::NAME
                    )))
                }
            }
        });

        let reports = try_join_all(runs).await?;
        let mut failures = ValidationFailures::new();
        for reported in reports {
            failures.extend(reported);
        }
        Ok(failures)
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for ValidationBehavior<R> {
    async fn handle(
        &self,
        request: R,
        ctx: &DispatchContext,
        next: Next<'_, R>,
    ) -> Result<R::Response, DispatchError> {
        if self.validators.is_empty() {
            return next.run(request, ctx).await;
        }

        let failures = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(DispatchError::Cancelled),
            collected = self.collect_failures(&request) => collected?,
        };

        if !failures.is_empty() {
            tracing::debug!(
                request_type = R::NAME,
                failures = failures.len(),
                "request rejected by validators"
            );
            return Err(DispatchError::ValidationFailed(failures));
        }

        next.run(request, ctx).await
    }
}
