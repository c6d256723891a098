//! Errors - dispatch の失敗分類
//!
//! # 分類
//! - ValidationFailed: 入力が不正（呼び出し側で修正可能、リトライしない）
//! - HandlerNotFound: 設定ミス（起動時検証で検出されるべき）
//! - Cancelled: 呼び出し側の取り消し・期限切れ
//! - DomainFault: ハンドラのビジネスエラー（中身は解釈せずそのまま返す）
//! - UnexpectedFault: それ以外（validator のクラッシュ、ストア障害など）
//!
//! HTTP ステータスなどワイヤ表現への変換は境界層の責務で、ここでは行いません。

use serde::{Deserialize, Serialize};
use std::fmt;

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Ordered failures collected from every validator of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationFailures(Vec<ValidationFailure>);

impl ValidationFailures {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationFailure> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ValidationFailure] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ValidationFailure> {
        self.0
    }
}

impl From<Vec<ValidationFailure>> for ValidationFailures {
    fn from(failures: Vec<ValidationFailure>) -> Self {
        Self(failures)
    }
}

impl Extend<ValidationFailure> for ValidationFailures {
    fn extend<I: IntoIterator<Item = ValidationFailure>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ValidationFailures {
    type Item = ValidationFailure;
    type IntoIter = std::vec::IntoIter<ValidationFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// DispatchError は dispatch 全体の失敗
///
/// すべてのステージは成功値か DispatchError のどちらかを返します。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    ValidationFailed(ValidationFailures),

    #[error("handler not found for request_type={0}")]
    HandlerNotFound(&'static str),

    #[error("dispatch cancelled")]
    Cancelled,

    #[error("{kind}: {detail}")]
    DomainFault { kind: String, detail: String },

    #[error("unexpected fault: {0}")]
    UnexpectedFault(String),
}

/// FailureKind は DispatchError の種類だけを表す（ログ・境界層向け）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ValidationFailed,
    HandlerNotFound,
    Cancelled,
    DomainFault,
    UnexpectedFault,
}

impl DispatchError {
    pub fn domain(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        DispatchError::DomainFault {
            kind: kind.into(),
            detail: detail.into(),
        }
    }

    /// `{entity} '{id}' was not found.` の DomainFault
    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        Self::domain("not_found", format!("{entity} '{id}' was not found."))
    }

    pub fn unexpected(detail: impl fmt::Display) -> Self {
        DispatchError::UnexpectedFault(detail.to_string())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            DispatchError::ValidationFailed(_) => FailureKind::ValidationFailed,
            DispatchError::HandlerNotFound(_) => FailureKind::HandlerNotFound,
            DispatchError::Cancelled => FailureKind::Cancelled,
            DispatchError::DomainFault { .. } => FailureKind::DomainFault,
            DispatchError::UnexpectedFault(_) => FailureKind::UnexpectedFault,
        }
    }

    pub fn validation_failures(&self) -> Option<&ValidationFailures> {
        match self {
            DispatchError::ValidationFailed(failures) => Some(failures),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::validation(
        DispatchError::ValidationFailed(vec![ValidationFailure::new("name", "Name is required")].into()),
        FailureKind::ValidationFailed
    )]
    #[case::not_found(DispatchError::HandlerNotFound("x.y.v1"), FailureKind::HandlerNotFound)]
    #[case::cancelled(DispatchError::Cancelled, FailureKind::Cancelled)]
    #[case::domain(DispatchError::domain("conflict", "already exists"), FailureKind::DomainFault)]
    #[case::unexpected(DispatchError::unexpected("boom"), FailureKind::UnexpectedFault)]
    fn kind_matches_variant(#[case] error: DispatchError, #[case] expected: FailureKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn validation_message_lists_every_failure() {
        let error = DispatchError::ValidationFailed(
            vec![
                ValidationFailure::new("name", "Name is required"),
                ValidationFailure::new("price", "Price must be greater than 0"),
            ]
            .into(),
        );
        assert_eq!(
            error.to_string(),
            "validation failed: name: Name is required; price: Price must be greater than 0"
        );
    }

    #[test]
    fn not_found_is_a_domain_fault() {
        let error = DispatchError::not_found("Product", "product-1");
        assert_eq!(
            error,
            DispatchError::DomainFault {
                kind: "not_found".to_string(),
                detail: "Product 'product-1' was not found.".to_string(),
            }
        );
    }

    #[test]
    fn failures_serialize_as_plain_list() {
        let failures: ValidationFailures = vec![ValidationFailure::new("price", "too low")].into();
        let json = serde_json::to_value(&failures).unwrap();
        assert_eq!(json, serde_json::json!([{ "field": "price", "message": "too low" }]));
    }
}
