use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{GraphError, Result};

/// A scalar from the dataset's `kw` or `candidate` lists.
///
/// Strings and numbers are distinct keys, so `17` and `"17"` are two
/// restaurants. Numbers compare by value (`1` equals `1.0`). Anything else
/// (booleans, null, nested values) is kept as its JSON text.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Other(String),
}

/// Restaurant identifier as it appears in a `candidate` list.
pub type RestaurantId = Scalar;

#[derive(PartialEq, Eq, Hash)]
enum NumberKey {
    Int(i128),
    Float(u64),
}

fn number_key(n: &serde_json::Number) -> NumberKey {
    if let Some(i) = n.as_i64() {
        return NumberKey::Int(i as i128);
    }
    if let Some(u) = n.as_u64() {
        return NumberKey::Int(u as i128);
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 2f64.powi(96) {
        NumberKey::Int(f as i128)
    } else {
        NumberKey::Float(f.to_bits())
    }
}

impl Scalar {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Scalar {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Scalar::Text(s),
            serde_json::Value::Number(n) => Scalar::Number(n),
            other => Scalar::Other(other.to_string()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            (Scalar::Number(a), Scalar::Number(b)) => number_key(a) == number_key(b),
            (Scalar::Other(a), Scalar::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Scalar::Text(s) => (0u8, s).hash(state),
            Scalar::Number(n) => (1u8, number_key(n)).hash(state),
            Scalar::Other(s) => (2u8, s).hash(state),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) | Scalar::Other(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    kw: Option<Vec<Scalar>>,
    #[serde(default)]
    candidate: Option<Vec<RestaurantId>>,
}

impl UserRecord {
    pub fn keywords(&self) -> &[Scalar] {
        self.kw.as_deref().unwrap_or(&[])
    }

    pub fn candidates(&self) -> &[RestaurantId] {
        self.candidate.as_deref().unwrap_or(&[])
    }
}

/// Users in document order.
#[derive(Debug, Default)]
pub struct Dataset {
    pub users: IndexMap<String, UserRecord>,
}

/// Restaurant id -> keywords, both in first-seen order.
pub type RestaurantKeywordIndex = IndexMap<RestaurantId, IndexSet<Scalar>>;

/// Restaurant id -> display label ("Restaurant 1", ...).
pub type RestaurantLabels = IndexMap<RestaurantId, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub keyword: String,
    pub restaurant: String,
}

impl Edge {
    pub fn new(keyword: impl ToString, restaurant: impl ToString) -> Self {
        Edge {
            keyword: keyword.to_string(),
            restaurant: restaurant.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Aggregation {
    pub index: RestaurantKeywordIndex,
    pub labels: RestaurantLabels,
    pub edges: Vec<Edge>,
}

impl Dataset {
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|source| GraphError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if !value.is_object() {
            return Err(GraphError::NotAnObject(path.to_path_buf()));
        }
        let users = serde_json::from_value(value).map_err(|source| GraphError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Dataset { users })
    }
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let text = fs::read_to_string(path).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = Dataset::parse(&text, path)?;
    info!(path = %path.display(), users = dataset.users.len(), "loaded dataset");
    Ok(dataset)
}

pub fn build_index(dataset: &Dataset) -> RestaurantKeywordIndex {
    let mut index = RestaurantKeywordIndex::new();

    for (user_id, record) in &dataset.users {
        let keywords = record.keywords();
        let candidates = record.candidates();

        // Pairs past the shorter list are dropped.
        if keywords.len() != candidates.len() {
            warn!(
                user = %user_id,
                keywords = keywords.len(),
                candidates = candidates.len(),
                "keyword and candidate lists differ in length, truncating"
            );
        }

        for (candidate, keyword) in candidates.iter().zip(keywords) {
            index
                .entry(candidate.clone())
                .or_default()
                .insert(keyword.clone());
        }
    }

    debug!(restaurants = index.len(), "built restaurant keyword index");
    index
}

pub fn assign_labels(index: &RestaurantKeywordIndex) -> RestaurantLabels {
    index
        .keys()
        .enumerate()
        .map(|(i, restaurant)| (restaurant.clone(), format!("Restaurant {}", i + 1)))
        .collect()
}

pub fn filter_edges(
    index: &RestaurantKeywordIndex,
    labels: &RestaurantLabels,
    allow_list: &HashSet<String>,
) -> Result<Vec<Edge>> {
    let mut edges = Vec::new();

    for (restaurant, keywords) in index {
        let label = labels
            .get(restaurant)
            .ok_or_else(|| GraphError::MissingLabel(restaurant.to_string()))?;

        for keyword in keywords.iter().filter_map(Scalar::as_text) {
            if allow_list.contains(keyword) {
                edges.push(Edge::new(keyword, label));
            }
        }
    }

    Ok(edges)
}

pub fn aggregate(dataset: &Dataset, allow_list: &HashSet<String>) -> Result<Aggregation> {
    let index = build_index(dataset);
    let labels = assign_labels(&index);
    let edges = filter_edges(&index, &labels, allow_list)?;

    debug!(
        labels = labels.len(),
        edges = edges.len(),
        "filtered edges to allow-list"
    );

    Ok(Aggregation {
        index,
        labels,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    fn allow_list() -> HashSet<String> {
        ["sushi", "milk", "pizza"].iter().map(|s| s.to_string()).collect()
    }

    fn dataset(json: &str) -> Dataset {
        Dataset::parse(json, Path::new("test.json")).unwrap()
    }

    fn id(s: &str) -> RestaurantId {
        RestaurantId::from(s)
    }

    fn kw(s: &str) -> Scalar {
        Scalar::from(s)
    }

    fn number(json: &str) -> Scalar {
        Scalar::Number(serde_json::from_str(json).unwrap())
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLog {
        type Writer = CapturedLog;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn build_index_logged(data: &Dataset) -> (RestaurantKeywordIndex, String) {
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let index = tracing::subscriber::with_default(subscriber, || build_index(data));
        (index, log.contents())
    }

    #[test]
    fn test_single_user_example() {
        let data = dataset(r#"{"u1": {"kw": ["sushi", "tea"], "candidate": ["r1", "r2"]}}"#);
        let agg = aggregate(&data, &allow_list()).unwrap();

        assert_eq!(agg.index.len(), 2);
        assert!(agg.index[&id("r1")].contains(&kw("sushi")));
        assert!(agg.index[&id("r2")].contains(&kw("tea")));
        assert_eq!(agg.labels[&id("r1")], "Restaurant 1");
        assert_eq!(agg.labels[&id("r2")], "Restaurant 2");
        assert_eq!(agg.edges, vec![Edge::new("sushi", "Restaurant 1")]);
    }

    #[test]
    fn test_mismatched_lengths_truncate() {
        let data = dataset(r#"{"u1": {"kw": ["pizza"], "candidate": ["r1", "r2"]}}"#);
        let agg = aggregate(&data, &allow_list()).unwrap();

        assert_eq!(agg.index.len(), 1);
        assert!(!agg.index.contains_key(&id("r2")));
        assert_eq!(agg.edges, vec![Edge::new("pizza", "Restaurant 1")]);

        let data = dataset(r#"{"u1": {"kw": ["pizza", "milk", "sushi"], "candidate": ["r1"]}}"#);
        let index = build_index(&data);
        assert_eq!(index.len(), 1);
        assert_eq!(index[&id("r1")].len(), 1);
    }

    #[test]
    fn test_missing_and_null_fields_are_empty() {
        let data = dataset(
            r#"{
                "u1": {},
                "u2": {"kw": null, "candidate": ["r1"]},
                "u3": {"kw": ["milk"]},
                "u4": {"other": 1}
            }"#,
        );
        let agg = aggregate(&data, &allow_list()).unwrap();
        assert!(agg.index.is_empty());
        assert!(agg.labels.is_empty());
        assert!(agg.edges.is_empty());
    }

    #[test]
    fn test_duplicate_pairs_collapse() {
        let data = dataset(
            r#"{
                "u1": {"kw": ["sushi", "sushi"], "candidate": ["r1", "r1"]},
                "u2": {"kw": ["sushi"], "candidate": ["r1"]}
            }"#,
        );
        let agg = aggregate(&data, &allow_list()).unwrap();
        assert_eq!(agg.index[&id("r1")].len(), 1);
        assert_eq!(agg.edges, vec![Edge::new("sushi", "Restaurant 1")]);
    }

    #[test]
    fn test_edges_only_contain_allowed_keywords() {
        let data = dataset(
            r#"{
                "u1": {"kw": ["sushi", "tea", "milk"], "candidate": ["r1", "r2", "r3"]},
                "u2": {"kw": ["ramen", "pizza", "coffee"], "candidate": ["r2", "r3", "r4"]}
            }"#,
        );
        let allow = allow_list();
        let agg = aggregate(&data, &allow).unwrap();

        assert_eq!(agg.edges.len(), 3);
        assert!(agg.edges.iter().all(|e| allow.contains(&e.keyword)));
        // every restaurant is labelled, edge or not
        assert_eq!(agg.labels.len(), 4);
    }

    #[test]
    fn test_labels_are_a_bijection_in_first_seen_order() {
        let data = dataset(
            r#"{
                "z": {"kw": ["milk", "milk"], "candidate": ["r9", "r3"]},
                "a": {"kw": ["pizza", "sushi"], "candidate": ["r3", "r1"]}
            }"#,
        );
        let index = build_index(&data);
        let labels = assign_labels(&index);

        let order: Vec<_> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("r9".to_string(), "Restaurant 1"),
                ("r3".to_string(), "Restaurant 2"),
                ("r1".to_string(), "Restaurant 3"),
            ]
        );
        let distinct: HashSet<_> = labels.values().collect();
        assert_eq!(distinct.len(), index.len());
    }

    #[test]
    fn test_numbers_and_strings_are_distinct_ids() {
        let data = dataset(r#"{"u1": {"kw": ["pizza", "milk"], "candidate": [17, "17"]}}"#);
        let agg = aggregate(&data, &allow_list()).unwrap();

        assert_eq!(agg.labels.len(), 2);
        assert_eq!(agg.labels[&number("17")], "Restaurant 1");
        assert_eq!(agg.labels[&id("17")], "Restaurant 2");
        assert_eq!(
            agg.edges,
            vec![
                Edge::new("pizza", "Restaurant 1"),
                Edge::new("milk", "Restaurant 2"),
            ]
        );
    }

    #[test]
    fn test_equal_numbers_are_one_id() {
        let data = dataset(
            r#"{
                "u1": {"kw": ["pizza"], "candidate": [1]},
                "u2": {"kw": ["milk", "sushi"], "candidate": [1.0, 2.5]}
            }"#,
        );
        let agg = aggregate(&data, &allow_list()).unwrap();

        assert_eq!(agg.labels.len(), 2);
        assert_eq!(agg.index[&number("1")].len(), 2);
        assert_eq!(agg.labels[&number("2.5")], "Restaurant 2");
    }

    #[test]
    fn test_non_string_keywords_keep_their_position() {
        let data = dataset(
            r#"{"u1": {"kw": [5, "pizza", null], "candidate": ["r1", "r2", "r3"]}}"#,
        );
        let agg = aggregate(&data, &allow_list()).unwrap();

        assert_eq!(agg.index.len(), 3);
        assert!(agg.index[&id("r1")].contains(&number("5")));
        assert_eq!(agg.edges, vec![Edge::new("pizza", "Restaurant 2")]);
    }

    #[test]
    fn test_truncation_is_logged() {
        let data = dataset(r#"{"u7": {"kw": ["pizza"], "candidate": ["r1", "r2"]}}"#);
        let (index, log) = build_index_logged(&data);

        assert_eq!(index.len(), 1);
        assert!(log.contains("WARN"));
        assert!(log.contains("keyword and candidate lists differ in length"));
        assert!(log.contains("user=u7"));
        assert!(log.contains("keywords=1"));
        assert!(log.contains("candidates=2"));
    }

    #[test]
    fn test_equal_lengths_are_not_logged() {
        let data = dataset(r#"{"u1": {"kw": ["pizza"], "candidate": ["r1"]}}"#);
        let (_, log) = build_index_logged(&data);
        assert!(log.is_empty());
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let data = dataset(
            r#"{
                "u1": {"kw": ["sushi", "pizza", "milk"], "candidate": ["a", "b", "c"]},
                "u2": {"kw": ["pizza", "sushi"], "candidate": ["c", "a"]}
            }"#,
        );
        let first = aggregate(&data, &allow_list()).unwrap();
        let second = aggregate(&data, &allow_list()).unwrap();
        assert_eq!(first.edges, second.edges);
        assert_eq!(first.labels, second.labels);
    }

    #[test]
    fn test_missing_label_is_an_error() {
        let data = dataset(r#"{"u1": {"kw": ["sushi"], "candidate": ["r1"]}}"#);
        let index = build_index(&data);
        let labels = RestaurantLabels::new();

        let err = filter_edges(&index, &labels, &allow_list()).unwrap_err();
        assert!(matches!(err, GraphError::MissingLabel(ref r) if r == "r1"));
    }

    #[test]
    fn test_load_dataset_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"u1": {{"kw": ["milk"], "candidate": ["r1"]}}}}"#).unwrap();

        let data = load_dataset(file.path()).unwrap();
        assert_eq!(data.users.len(), 1);
        assert_eq!(data.users["u1"].keywords(), [kw("milk")]);
    }

    #[test]
    fn test_load_dataset_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        assert!(matches!(load_dataset(&missing), Err(GraphError::Io { .. })));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(load_dataset(&broken), Err(GraphError::Parse { .. })));

        let list = dir.path().join("list.json");
        fs::write(&list, "[1, 2, 3]").unwrap();
        assert!(matches!(load_dataset(&list), Err(GraphError::NotAnObject(_))));
    }
}
