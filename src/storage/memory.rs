//! In-process document store
//!
//! Implements the `DocumentStore` contract over plain maps, interpreting
//! the same filter subset the manager emits against the real database.
//! Backs the test suite; no I/O involved.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bson::{Bson, Document};

use super::store::{DocumentStore, SortDirection, StoreResult};

/// In-memory document store
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Ordering between two bson values, where one exists.
///
/// Numerics compare across integer/double representations; other types
/// compare only against themselves.
fn compare_bson(a: &Bson, b: &Bson) -> Option<Ordering> {
    fn as_f64(v: &Bson) -> Option<f64> {
        match v {
            Bson::Double(d) => Some(*d),
            Bson::Int32(i) => Some(*i as f64),
            Bson::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    match (a, b) {
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

/// Whether a single field value satisfies a filter condition.
///
/// A condition is either a literal (implicit equality) or a document of
/// range operators.
fn matches_condition(value: Option<&Bson>, condition: &Bson) -> bool {
    match condition {
        Bson::Document(ops) if ops.keys().any(|k| k.starts_with('$')) => {
            let value = match value {
                Some(v) => v,
                None => return false,
            };
            ops.iter().all(|(op, bound)| {
                let ord = match compare_bson(value, bound) {
                    Some(ord) => ord,
                    None => return false,
                };
                match op.as_str() {
                    "$gt" => ord == Ordering::Greater,
                    "$gte" => ord != Ordering::Less,
                    "$lt" => ord == Ordering::Less,
                    "$lte" => ord != Ordering::Greater,
                    "$eq" => ord == Ordering::Equal,
                    _ => false,
                }
            })
        }
        literal => value == Some(literal),
    }
}

fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, condition)| matches_condition(doc.get(field), condition))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<(&str, SortDirection)>,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Document>> {
        let collections = self.collections.lock().unwrap();
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches_filter(doc, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = sort {
            docs.sort_by(|a, b| {
                let ord = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => compare_bson(x, y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = limit {
            docs.truncate(limit.max(0) as usize);
        }
        Ok(docs)
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> StoreResult<()> {
        let mut collections = self.collections.lock().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
        Ok(())
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let mut collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !matches_filter(doc, &filter));
        Ok((before - docs.len()) as u64)
    }

    async fn upsert_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> StoreResult<()> {
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();

        if let Some(doc) = docs.iter_mut().find(|doc| matches_filter(doc, &filter)) {
            for (field, value) in set {
                doc.insert(field, value);
            }
        } else {
            let mut doc = Document::new();
            for (field, value) in filter {
                // Range conditions in a filter do not seed inserted fields.
                if !matches!(&value, Bson::Document(ops) if ops.keys().any(|k| k.starts_with('$')))
                {
                    doc.insert(field, value);
                }
            }
            for (field, value) in set {
                doc.insert(field, value);
            }
            docs.push(doc);
        }
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let collections = self.collections.lock().unwrap();
        let count = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| matches_filter(doc, &filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn estimated_count(&self, collection: &str) -> StoreResult<u64> {
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(collection).map(Vec::len).unwrap_or(0) as u64)
    }

    async fn list_collections(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn distinct(&self, collection: &str, field: &str) -> StoreResult<Vec<Bson>> {
        let collections = self.collections.lock().unwrap();
        let mut values: Vec<Bson> = Vec::new();
        if let Some(docs) = collections.get(collection) {
            for doc in docs {
                if let Some(value) = doc.get(field) {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
            }
        }
        Ok(values)
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        let mut collections = self.collections.lock().unwrap();
        collections.remove(collection);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let collections = self.collections.lock().unwrap();
        f.debug_struct("MemoryStore")
            .field("collections", &collections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn test_find_with_range_filter_sort_and_limit() {
        let store = MemoryStore::new();
        store
            .insert_many(
                "t",
                vec![
                    doc! { "n": 3.0, "tag": "a" },
                    doc! { "n": 1.0, "tag": "a" },
                    doc! { "n": 2.0, "tag": "b" },
                ],
            )
            .await
            .unwrap();

        let docs = store
            .find(
                "t",
                doc! { "n": { "$gte": 1.0, "$lte": 3.0 }, "tag": "a" },
                Some(("n", SortDirection::Ascending)),
                None,
            )
            .await
            .unwrap();
        let ns: Vec<f64> = docs.iter().map(|d| d.get_f64("n").unwrap()).collect();
        assert_eq!(ns, vec![1.0, 3.0]);

        let docs = store
            .find("t", doc! {}, Some(("n", SortDirection::Descending)), Some(1))
            .await
            .unwrap();
        assert_eq!(docs[0].get_f64("n").unwrap(), 3.0);
    }

    #[tokio::test]
    async fn test_strict_range_excludes_bounds() {
        let store = MemoryStore::new();
        store
            .insert_many(
                "t",
                vec![doc! { "n": 1.0 }, doc! { "n": 2.0 }, doc! { "n": 3.0 }],
            )
            .await
            .unwrap();

        let deleted = store
            .delete_many("t", doc! { "n": { "$gt": 1.0, "$lt": 3.0 } })
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.estimated_count("t").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_updates_then_inserts() {
        let store = MemoryStore::new();
        store
            .upsert_one("t", doc! { "k": 1 }, doc! { "v": 10.0 })
            .await
            .unwrap();
        store
            .upsert_one("t", doc! { "k": 1 }, doc! { "v": 20.0 })
            .await
            .unwrap();

        assert_eq!(store.estimated_count("t").await.unwrap(), 1);
        let docs = store.find("t", doc! { "k": 1 }, None, None).await.unwrap();
        assert_eq!(docs[0].get_f64("v").unwrap(), 20.0);
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty_not_error() {
        let store = MemoryStore::new();
        assert!(store.find("none", doc! {}, None, None).await.unwrap().is_empty());
        assert_eq!(store.delete_many("none", doc! {}).await.unwrap(), 0);
        assert_eq!(store.estimated_count("none").await.unwrap(), 0);
        store.drop_collection("none").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_and_distinct() {
        let store = MemoryStore::new();
        store
            .insert_many("kline:cme:es", vec![doc! { "period": "1m" }, doc! { "period": "1m" }])
            .await
            .unwrap();
        store
            .insert_many("tick:cme:es", vec![doc! { "period": "x" }])
            .await
            .unwrap();

        let names = store.list_collections("kline:").await.unwrap();
        assert_eq!(names, vec!["kline:cme:es".to_string()]);

        let periods = store.distinct("kline:cme:es", "period").await.unwrap();
        assert_eq!(periods, vec![Bson::String("1m".to_string())]);
    }
}
