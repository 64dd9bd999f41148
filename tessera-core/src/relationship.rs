use crate::logic_module::ModelRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed edge between two LogicModuleModels.
///
/// `key` is the attribute name under which related data is embedded in the
/// joined response. Direction of traversal is decided per join, never by the
/// edge itself: a relationship is traversed forward from its origin model and
/// in reverse from its related model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    pub key: String,
    pub origin_model: ModelRef,
    pub related_model: ModelRef,
}

/// A materialized link between one origin record's key and one related
/// record's key.
///
/// Exactly one of `related_record_id` / `related_record_uuid` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRecord {
    pub relationship_key: String,
    pub origin_pk: String,
    #[serde(default)]
    pub related_record_id: Option<i64>,
    #[serde(default)]
    pub related_record_uuid: Option<Uuid>,
}

impl JoinRecord {
    /// The related key in canonical string form, whichever field holds it.
    pub fn related_pk(&self) -> Option<String> {
        match (self.related_record_id, self.related_record_uuid) {
            (Some(id), None) => Some(id.to_string()),
            (None, Some(uuid)) => Some(uuid.to_string()),
            _ => None,
        }
    }
}

/// Decide which model a join record points at and which key selects the
/// related record, given the traversal direction.
///
/// Forward: fetch from the related model using the record's related key.
/// Reverse: fetch from the origin model using the record's origin key.
/// Returns `None` when the join record violates the exactly-one-related-key
/// invariant.
pub fn related_lookup<'a>(
    is_forward: bool,
    relationship: &'a Relationship,
    join_record: &JoinRecord,
) -> Option<(&'a ModelRef, String)> {
    if is_forward {
        join_record
            .related_pk()
            .map(|pk| (&relationship.related_model, pk))
    } else {
        Some((&relationship.origin_model, join_record.origin_pk.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel() -> Relationship {
        Relationship {
            key: "items".into(),
            origin_model: ModelRef {
                logic_module_endpoint_name: "orders".into(),
                endpoint: "/orders/".into(),
            },
            related_model: ModelRef {
                logic_module_endpoint_name: "products".into(),
                endpoint: "/products/".into(),
            },
        }
    }

    #[test]
    fn test_related_pk_from_numeric_id() {
        let jr = JoinRecord {
            relationship_key: "items".into(),
            origin_pk: "7".into(),
            related_record_id: Some(10),
            related_record_uuid: None,
        };
        assert_eq!(jr.related_pk(), Some("10".to_string()));
    }

    #[test]
    fn test_related_pk_from_uuid() {
        let uuid = Uuid::new_v4();
        let jr = JoinRecord {
            relationship_key: "items".into(),
            origin_pk: "7".into(),
            related_record_id: None,
            related_record_uuid: Some(uuid),
        };
        assert_eq!(jr.related_pk(), Some(uuid.to_string()));
    }

    #[test]
    fn test_related_pk_requires_exactly_one_key() {
        let both = JoinRecord {
            relationship_key: "items".into(),
            origin_pk: "7".into(),
            related_record_id: Some(10),
            related_record_uuid: Some(Uuid::new_v4()),
        };
        assert_eq!(both.related_pk(), None);

        let neither = JoinRecord {
            relationship_key: "items".into(),
            origin_pk: "7".into(),
            related_record_id: None,
            related_record_uuid: None,
        };
        assert_eq!(neither.related_pk(), None);
    }

    #[test]
    fn test_forward_lookup_targets_related_model() {
        let relationship = rel();
        let jr = JoinRecord {
            relationship_key: "items".into(),
            origin_pk: "7".into(),
            related_record_id: Some(10),
            related_record_uuid: None,
        };
        let (model, pk) = related_lookup(true, &relationship, &jr).unwrap();
        assert_eq!(model.logic_module_endpoint_name, "products");
        assert_eq!(pk, "10");
    }

    #[test]
    fn test_reverse_lookup_targets_origin_model() {
        let relationship = rel();
        let jr = JoinRecord {
            relationship_key: "items".into(),
            origin_pk: "7".into(),
            related_record_id: Some(10),
            related_record_uuid: None,
        };
        let (model, pk) = related_lookup(false, &relationship, &jr).unwrap();
        assert_eq!(model.logic_module_endpoint_name, "orders");
        assert_eq!(pk, "7");
    }

    #[test]
    fn test_forward_lookup_with_invalid_record_is_none() {
        let relationship = rel();
        let jr = JoinRecord {
            relationship_key: "items".into(),
            origin_pk: "7".into(),
            related_record_id: None,
            related_record_uuid: None,
        };
        assert!(related_lookup(true, &relationship, &jr).is_none());
    }
}
