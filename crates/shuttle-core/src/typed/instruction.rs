//! Instruction trait - payload 型と `type` タグの対応付け
//!
//! # 学習ポイント
//! - 関連定数 (`const TYPE`) による型ごとのメタデータ

use serde::Serialize;
use serde::de::DeserializeOwned;

/// 命令の種類を表す payload フィールド名
pub const TYPE_FIELD: &str = "type";

/// 型付き命令 payload
///
/// # Example
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Move {
///     x: i32,
///     y: i32,
/// }
///
/// impl Instruction for Move {
///     const TYPE: &'static str = "arm.move.v1";
/// }
/// ```
///
/// キュー上の payload は構造体をシリアライズしたものに
/// `TYPE` を持つ `"type"` フィールドを加えた形になる。
pub trait Instruction: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 命名規約: `{namespace}.{action}.v{major}`
    const TYPE: &'static str;

    /// `TYPE` タグ付きのキュー payload にシリアライズ
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        let mut fields = match value {
            serde_json::Value::Object(fields) => fields,
            other => {
                // Non-struct instructions are wrapped under `value`.
                let mut fields = serde_json::Map::new();
                fields.insert("value".to_string(), other);
                fields
            }
        };
        fields.insert(TYPE_FIELD.to_string(), Self::TYPE.into());
        Ok(serde_json::Value::Object(fields))
    }
}

/// payload の `type` タグを読む
pub fn instruction_type(payload: &serde_json::Value) -> Option<&str> {
    payload.get(TYPE_FIELD).and_then(serde_json::Value::as_str)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Instruction;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Echo {
        pub text: String,
    }

    impl Instruction for Echo {
        const TYPE: &'static str = "test.echo.v1";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Add {
        pub a: i64,
        pub b: i64,
    }

    impl Instruction for Add {
        const TYPE: &'static str = "test.add.v1";
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::Echo;
    use super::*;

    #[test]
    fn payload_carries_type_tag() {
        let payload = Echo {
            text: "hi".into(),
        }
        .to_payload()
        .unwrap();
        assert_eq!(payload["text"], "hi");
        assert_eq!(instruction_type(&payload), Some(Echo::TYPE));

        let back: Echo = serde_json::from_value(payload).unwrap();
        assert_eq!(back.text, "hi");
    }

    #[test]
    fn untagged_payload_has_no_type() {
        assert_eq!(instruction_type(&serde_json::json!({"text": "hi"})), None);
        assert_eq!(instruction_type(&serde_json::json!([1, 2])), None);
    }
}
