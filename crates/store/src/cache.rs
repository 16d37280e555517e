use crate::collections::WEIGHTS_KEY;
use crate::error::{Result, StoreError};
use crate::store::KnowledgeStore;
use crate::types::SearchResult;
use knowledge_metadata::{Scalar, Value};

pub const DEFAULT_WEIGHT_INCREMENT: u32 = 1;

impl KnowledgeStore {
    /// Add `increment` to the result's `weights` and rewrite it into `samples_store`
    /// under the same id.
    ///
    /// A missing or null weight starts at 0. Integer weights stay integers and float
    /// weights stay floats. Any other weight is an [`StoreError::InvalidWeight`] and
    /// nothing is written. `result` is updated in place; the new weight is returned.
    pub async fn update_weights(
        &self,
        result: &mut SearchResult,
        increment: u32,
    ) -> Result<Scalar> {
        let next = next_weight(result.metadatas.get(WEIGHTS_KEY), increment)
            .ok_or_else(|| StoreError::InvalidWeight(format!("record {}", result.id)))?;
        result
            .metadatas
            .insert(WEIGHTS_KEY.to_string(), Value::Scalar(next.clone()));

        self.update_store(Some(result.id.clone()), &result.metadatas, &result.document)
            .await?;
        log::debug!("Weight of {} is now {next:?}", result.id);
        Ok(next)
    }

    pub async fn record_cache_hit(&self, result: &mut SearchResult) -> Result<Scalar> {
        self.update_weights(result, DEFAULT_WEIGHT_INCREMENT).await
    }
}

fn next_weight(current: Option<&Value>, increment: u32) -> Option<Scalar> {
    match current {
        None | Some(Value::Scalar(Scalar::Null)) => Some(Scalar::Int(i64::from(increment))),
        Some(Value::Scalar(Scalar::Int(n))) => {
            Some(Scalar::Int(n.saturating_add(i64::from(increment))))
        }
        Some(Value::Scalar(Scalar::Float(f))) if f.is_finite() => {
            Some(Scalar::Float(f + f64::from(increment)))
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn weights_keep_their_numeric_kind() {
        assert_eq!(next_weight(None, 1), Some(Scalar::Int(1)));
        assert_eq!(
            next_weight(Some(&Value::Scalar(Scalar::Null)), 2),
            Some(Scalar::Int(2))
        );
        assert_eq!(next_weight(Some(&Value::from(4_i64)), 1), Some(Scalar::Int(5)));
        assert_eq!(next_weight(Some(&Value::from(2.5)), 1), Some(Scalar::Float(3.5)));
        assert_eq!(
            next_weight(Some(&Value::from(i64::MAX)), 1),
            Some(Scalar::Int(i64::MAX))
        );
    }

    #[test]
    fn non_numeric_weights_are_rejected() {
        assert_eq!(next_weight(Some(&Value::text("3")), 1), None);
        assert_eq!(next_weight(Some(&Value::from(f64::NAN)), 1), None);
        let list = Value::List(vec![Value::from(1_i64)]);
        assert_eq!(next_weight(Some(&list), 1), None);
    }
}
