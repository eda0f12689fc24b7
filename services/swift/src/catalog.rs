use crate::constants::{X_CONTAINER_BYTES_USED, X_CONTAINER_OBJECT_COUNT};
use crate::{RequestSpec, Response, Session};
use http::Method;
use log::debug;
use reqstore_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Mutex;

/// Item type a [`Catalog`] can list.
pub trait CatalogItem: DeserializeOwned + PartialEq + Clone + Debug + Send + Sync + 'static {}

impl<T> CatalogItem for T where T: DeserializeOwned + PartialEq + Clone + Debug + Send + Sync + 'static
{}

/// A tag attached to storage resources.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
}

impl Tag {
    /// Create a tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One entry of an account's container listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerEntry {
    /// Container name.
    pub name: String,
    /// Number of objects.
    #[serde(default)]
    pub count: u64,
    /// Total bytes stored.
    #[serde(default)]
    pub bytes: u64,
}

impl ContainerEntry {
    /// Build an entry from the `HEAD` response of container `name`.
    ///
    /// Missing counters read as zero.
    pub fn from_head(name: &str, resp: &Response) -> Result<Self> {
        let counter = |header: &str| -> Result<u64> {
            match resp.header(header) {
                Some(v) => v.trim().parse().map_err(|e| {
                    Error::response_decoding_failed(format!("invalid {header} {v:?}"))
                        .with_source(e)
                }),
                None => Ok(0),
            }
        };

        Ok(Self {
            name: name.to_string(),
            count: counter(X_CONTAINER_OBJECT_COUNT)?,
            bytes: counter(X_CONTAINER_BYTES_USED)?,
        })
    }
}

/// Ordered inclusion filter, empty means no filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterSet<T>(Vec<T>);

impl<T> Default for FilterSet<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: PartialEq> FilterSet<T> {
    /// Create a filter from items.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self(items.into_iter().collect())
    }

    /// Whether the filter lets everything through.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `item` passes the filter.
    pub fn matches(&self, item: &T) -> bool {
        self.0.is_empty() || self.0.contains(item)
    }

    /// Items in the filter.
    pub fn items(&self) -> &[T] {
        &self.0
    }
}

impl<T: DeserializeOwned + PartialEq> TryFrom<&serde_json::Value> for FilterSet<T> {
    type Error = Error;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Array(values) = value else {
            return Err(Error::invalid_filter_argument(format!(
                "filter must be a sequence, got {value}"
            )));
        };
        let items = values
            .iter()
            .map(|v| T::deserialize(v))
            .collect::<std::result::Result<Vec<T>, _>>()
            .map_err(|e| {
                Error::invalid_filter_argument("filter item has the wrong shape").with_source(e)
            })?;
        Ok(Self(items))
    }
}

/// How [`Catalog::get`] turns an identifier into an item.
pub enum Fetch<T> {
    /// `GET <item_path>/<id>?format=json`, the body is the item.
    Json,
    /// `HEAD <item_path>/<id>`, the item is built from the response headers.
    Head(fn(&str, &Response) -> Result<T>),
}

impl<T> Debug for Fetch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fetch::Json => f.write_str("Json"),
            Fetch::Head(_) => f.write_str("Head"),
        }
    }
}

/// Catalog lists and fetches items of one collection resource.
///
/// The last filter passed to [`Catalog::list`] is remembered, a later call
/// without a filter repeats it. The remembered filter starts empty.
#[derive(Debug)]
pub struct Catalog<T: CatalogItem> {
    session: Session,
    list_path: Option<String>,
    item_path: Option<String>,
    fetch: Fetch<T>,
    filter: Mutex<FilterSet<T>>,
}

impl<T: CatalogItem> Catalog<T> {
    /// Create a catalog listing `list_path` and fetching `item_path/<id>`.
    ///
    /// `None` means the storage base path itself. Items are fetched as JSON.
    pub fn new(session: Session, list_path: Option<String>, item_path: Option<String>) -> Self {
        Self {
            session,
            list_path,
            item_path,
            fetch: Fetch::Json,
            filter: Mutex::new(FilterSet::default()),
        }
    }

    /// Set how single items are fetched.
    pub fn with_fetch(mut self, fetch: Fetch<T>) -> Self {
        self.fetch = fetch;
        self
    }

    /// Filter remembered from the last listing.
    pub fn current_filter(&self) -> FilterSet<T> {
        self.filter.lock().expect("lock poisoned").clone()
    }

    /// Forget the remembered filter.
    pub fn reset_filter(&self) {
        *self.filter.lock().expect("lock poisoned") = FilterSet::default();
    }

    /// List items, keeping the ones matching the filter in service order.
    pub async fn list(&self, filter: Option<FilterSet<T>>) -> Result<Vec<T>> {
        let filter = {
            let mut current = self.filter.lock().expect("lock poisoned");
            if let Some(filter) = filter {
                *current = filter;
            }
            current.clone()
        };

        let mut spec = RequestSpec::new().with_query("format", "json");
        if let Some(path) = &self.list_path {
            spec = spec.with_path(path.clone());
        }
        let resp = self.session.request(spec).await?;
        // Empty listings may come back as 204 without a body.
        let items: Vec<T> = if resp.body.is_empty() {
            Vec::new()
        } else {
            resp.decode()?
        };
        let total = items.len();

        let items: Vec<T> = items.into_iter().filter(|v| filter.matches(v)).collect();
        debug!(
            "listed {total} items from {:?}, {} kept by filter",
            self.list_path,
            items.len()
        );
        Ok(items)
    }

    /// List items with a loosely typed filter.
    ///
    /// Fails with `InvalidFilterArgument` before any request when `filter` is
    /// not an array.
    pub async fn list_value(&self, filter: &serde_json::Value) -> Result<Vec<T>> {
        let filter = FilterSet::try_from(filter)?;
        self.list(Some(filter)).await
    }

    /// Fetch one item by identifier.
    ///
    /// A missing or empty identifier yields `Ok(None)` without a request. The
    /// identifier is encoded on dispatch, a `/` in it separates segments.
    pub async fn get(&self, id: Option<&str>) -> Result<Option<T>> {
        let Some(id) = id.filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        let path = match &self.item_path {
            Some(base) => format!("{}/{id}", base.trim_end_matches('/')),
            None => id.to_string(),
        };
        let item = match self.fetch {
            Fetch::Json => {
                let resp = self
                    .session
                    .request(RequestSpec::get(path).with_query("format", "json"))
                    .await?;
                resp.decode()?
            }
            Fetch::Head(build) => {
                let resp = self
                    .session
                    .request(
                        RequestSpec::new()
                            .with_method(Method::HEAD)
                            .with_path(path)
                            .with_parse_json(false),
                    )
                    .await?;
                build(id, &resp)?
            }
        };
        Ok(Some(item))
    }
}

impl Catalog<Tag> {
    /// Catalog of tags.
    pub fn tags(session: Session) -> Self {
        Self::new(session, Some("tags".to_string()), Some("tags".to_string()))
    }
}

impl Catalog<ContainerEntry> {
    /// Catalog of the account's containers.
    ///
    /// Containers answer `GET` with their object listing, so single entries
    /// are read from `HEAD`.
    pub fn containers(session: Session) -> Self {
        Self::new(session, None, None).with_fetch(Fetch::Head(ContainerEntry::from_head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_from_value() {
        let filter: FilterSet<String> = FilterSet::try_from(&json!(["a", "c"])).unwrap();
        assert_eq!(filter.items(), &["a".to_string(), "c".to_string()]);

        let filter: FilterSet<String> = FilterSet::try_from(&json!([])).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_from_non_sequence() {
        for value in [json!("a"), json!({"a": 1}), json!(null), json!(3)] {
            let err = FilterSet::<String>::try_from(&value).unwrap_err();
            assert_eq!(err.kind(), reqstore_core::ErrorKind::InvalidFilterArgument);
        }
    }

    fn head_response(headers: &[(&'static str, &'static str)]) -> Response {
        let mut map = http::HeaderMap::new();
        for (k, v) in headers {
            map.insert(*k, http::HeaderValue::from_static(*v));
        }
        Response {
            status: http::StatusCode::NO_CONTENT,
            headers: map,
            body: bytes::Bytes::new(),
            json: None,
        }
    }

    #[test]
    fn test_container_entry_from_head() {
        let resp = head_response(&[
            ("x-container-object-count", "2"),
            ("x-container-bytes-used", "9"),
        ]);
        let entry = ContainerEntry::from_head("photos", &resp).unwrap();
        assert_eq!(
            entry,
            ContainerEntry {
                name: "photos".to_string(),
                count: 2,
                bytes: 9,
            }
        );

        let entry = ContainerEntry::from_head("empty", &head_response(&[])).unwrap();
        assert_eq!((entry.count, entry.bytes), (0, 0));
    }

    #[test]
    fn test_container_entry_from_invalid_head() {
        let resp = head_response(&[("x-container-object-count", "many")]);
        let err = ContainerEntry::from_head("photos", &resp).unwrap_err();
        assert_eq!(err.kind(), reqstore_core::ErrorKind::ResponseDecodingFailed);
    }

    #[test]
    fn test_filter_matches() {
        let filter = FilterSet::new(["a", "c"]);
        assert!(filter.matches(&"a"));
        assert!(!filter.matches(&"b"));
        assert!(FilterSet::<&str>::default().matches(&"b"));
    }
}
