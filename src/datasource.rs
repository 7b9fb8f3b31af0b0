//! Paged listing with client-side filters, for data sources.

use std::collections::BTreeMap;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::api::{ErrorCodes, Invoker, Payload, Product, RpcRequest, lookup, scalar_to_string};
use crate::backoff::Backoff;
use crate::config::DEFAULT_TIMEOUT;
use crate::error::ReconcileError;
use crate::resource::Attributes;
use crate::retry::retry;
use crate::tags::{Tags, decode_tags, tags_to_attribute};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// How one data source lists and maps its items.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSpec {
    pub type_name: &'static str,
    pub product: Product,
    pub action: &'static str,
    pub page_size: u32,
    /// Path to the item array in each page.
    pub items_path: &'static str,
    pub id_field: &'static str,
    pub name_field: &'static str,
    /// Request parameter taking the wanted identifiers as a JSON list.
    pub ids_param: Option<&'static str>,
    /// Exact-match attributes the service can also filter on: attribute to parameter.
    pub server_filters: Vec<(&'static str, &'static str)>,
    /// Attribute name to path within an item.
    pub attributes: Vec<(&'static str, &'static str)>,
    /// Path to the item's tags, decoded into a `tags` attribute.
    pub tags_path: Option<&'static str>,
    /// Follow-up listings that fill attributes the main action lacks.
    pub lookups: Vec<Lookup>,
    pub retryable_codes: Vec<&'static str>,
    pub backoff: Backoff,
    pub timeout: Duration,
}

impl ListSpec {
    pub fn new(
        type_name: &'static str,
        product: Product,
        action: &'static str,
        items_path: &'static str,
    ) -> Self {
        Self {
            type_name,
            product,
            action,
            page_size: DEFAULT_PAGE_SIZE,
            items_path,
            id_field: "Id",
            name_field: "Name",
            ids_param: None,
            server_filters: Vec::new(),
            attributes: Vec::new(),
            tags_path: None,
            lookups: Vec::new(),
            retryable_codes: Vec::new(),
            backoff: Backoff::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn identified_by(mut self, id_field: &'static str, name_field: &'static str) -> Self {
        self.id_field = id_field;
        self.name_field = name_field;
        self
    }

    pub fn ids_param(mut self, param: &'static str) -> Self {
        self.ids_param = Some(param);
        self
    }

    pub fn server_filter(mut self, attribute: &'static str, param: &'static str) -> Self {
        self.server_filters.push((attribute, param));
        self
    }

    pub fn attribute(mut self, name: &'static str, path: &'static str) -> Self {
        self.attributes.push((name, path));
        self
    }

    pub fn tags(mut self, path: &'static str) -> Self {
        self.tags_path = Some(path);
        self
    }

    pub fn with_lookup(mut self, lookup: Lookup) -> Self {
        self.lookups.push(lookup);
        self
    }

    pub fn with_retryable(mut self, codes: &[&'static str]) -> Self {
        self.retryable_codes = codes.to_vec();
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(attr, _)| *attr == name)
            || self.lookups.iter().any(|l| l.attribute == name)
    }
}

/// A second paged action whose entries are matched to listed items by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub attribute: &'static str,
    pub action: &'static str,
    pub items_path: &'static str,
    pub page_size: u32,
    /// Field in each entry naming the item it belongs to.
    pub key_field: &'static str,
    pub value: LookupValue,
    /// Parameter taking the listed ids as a JSON list, and how many ids fit
    /// in one request. Without it the action is listed unscoped.
    pub ids_param: Option<(&'static str, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupValue {
    /// Scalar at this path in the first matching entry; null when none match.
    Scalar(&'static str),
    /// Every matching entry, each reduced to these fields.
    Objects(Vec<(&'static str, &'static str)>),
}

impl Lookup {
    pub fn new(
        attribute: &'static str,
        action: &'static str,
        items_path: &'static str,
        key_field: &'static str,
        value: LookupValue,
    ) -> Self {
        Self {
            attribute,
            action,
            items_path,
            page_size: DEFAULT_PAGE_SIZE,
            key_field,
            value,
            ids_param: None,
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn scoped_by(mut self, param: &'static str, chunk: usize) -> Self {
        self.ids_param = Some((param, chunk));
        self
    }
}

/// Caller-supplied filters. Empty fields filter nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub ids: Vec<String>,
    pub name_regex: Option<String>,
    pub exact: BTreeMap<String, String>,
    pub tags: Tags,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_name_regex(mut self, pattern: impl Into<String>) -> Self {
        self.name_regex = Some(pattern.into());
        self
    }

    pub fn with_filter(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.exact.insert(attribute.into(), value.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedItem {
    pub id: String,
    pub name: String,
    pub attributes: Attributes,
}

/// Matching items in arrival order, with their ids and names alongside.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListResult {
    pub ids: Vec<String>,
    pub names: Vec<String>,
    pub items: Vec<ListedItem>,
}

impl ListResult {
    fn from_items(items: Vec<ListedItem>) -> Self {
        Self {
            ids: items.iter().map(|i| i.id.clone()).collect(),
            names: items.iter().map(|i| i.name.clone()).collect(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fetch every page, then filter by identifier set and name pattern, fill
/// attributes from the follow-up lookups, and finally filter by exact
/// attribute values.
///
/// Paging stops at the first page shorter than the page size. All calls share
/// one deadline; a page is never requested once the budget is spent.
pub async fn list(
    invoker: &dyn Invoker,
    spec: &ListSpec,
    query: &ListQuery,
) -> Result<ListResult, ReconcileError> {
    let name_regex = match &query.name_regex {
        Some(pattern) if !pattern.is_empty() => Some(Regex::new(pattern).map_err(|e| {
            ReconcileError::validation(spec.type_name, format!("invalid name_regex: {}", e))
        })?),
        _ => None,
    };
    if let Some(unknown) = query.exact.keys().find(|a| !spec.has_attribute(a)) {
        return Err(ReconcileError::validation(
            spec.type_name,
            format!("cannot filter on unknown attribute '{}'", unknown),
        ));
    }

    let deadline = Instant::now() + spec.timeout;
    let pager = Pager {
        action: spec.action,
        items_path: spec.items_path,
        page_size: spec.page_size,
    };
    let raw_items = pager
        .fetch_all(invoker, spec, base_params(spec, query)?, deadline)
        .await?;
    let fetched = raw_items.len();

    let mut items: Vec<ListedItem> = raw_items
        .iter()
        .map(|raw| map_item(spec, raw))
        .filter(|item| query.ids.is_empty() || query.ids.contains(&item.id))
        .filter(|item| name_regex.as_ref().is_none_or(|re| re.is_match(&item.name)))
        .collect();

    if !items.is_empty() {
        for follow_up in &spec.lookups {
            follow_up.fill(invoker, spec, &mut items, deadline).await?;
        }
    }

    items.retain(|item| {
        query.exact.iter().all(|(attr, wanted)| {
            item.attributes
                .get(attr)
                .and_then(scalar_to_string)
                .is_some_and(|v| v == *wanted)
        })
    });

    tracing::info!(
        data_source = spec.type_name,
        fetched,
        matched = items.len(),
        "listing complete"
    );
    Ok(ListResult::from_items(items))
}

impl Lookup {
    async fn fill(
        &self,
        invoker: &dyn Invoker,
        spec: &ListSpec,
        items: &mut [ListedItem],
        deadline: Instant,
    ) -> Result<(), ReconcileError> {
        let pager = Pager {
            action: self.action,
            items_path: self.items_path,
            page_size: self.page_size,
        };

        let mut entries = Vec::new();
        match self.ids_param {
            Some((param, chunk)) => {
                let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
                for ids in ids.chunks(chunk.max(1)) {
                    let mut base = BTreeMap::new();
                    base.insert(param.to_string(), serde_json::to_string(ids)?);
                    entries.extend(pager.fetch_all(invoker, spec, base, deadline).await?);
                }
            }
            None => {
                entries = pager
                    .fetch_all(invoker, spec, BTreeMap::new(), deadline)
                    .await?;
            }
        }

        let mut by_item: BTreeMap<String, Vec<&Value>> = BTreeMap::new();
        for entry in &entries {
            if let Some(key) = lookup(entry, self.key_field).and_then(scalar_to_string) {
                by_item.entry(key).or_default().push(entry);
            }
        }

        for item in items.iter_mut() {
            let found = by_item.get(&item.id).map(Vec::as_slice).unwrap_or_default();
            let value = match &self.value {
                LookupValue::Scalar(path) => found
                    .first()
                    .and_then(|entry| lookup(entry, path))
                    .cloned()
                    .unwrap_or(Value::Null),
                LookupValue::Objects(fields) => Value::Array(
                    found
                        .iter()
                        .map(|entry| {
                            Value::Object(
                                fields
                                    .iter()
                                    .map(|(name, path)| {
                                        let v = lookup(entry, path).cloned().unwrap_or(Value::Null);
                                        (name.to_string(), v)
                                    })
                                    .collect(),
                            )
                        })
                        .collect(),
                ),
            };
            item.attributes.insert(self.attribute.to_string(), value);
        }
        tracing::debug!(
            data_source = spec.type_name,
            action = self.action,
            entries = entries.len(),
            "lookup applied"
        );
        Ok(())
    }
}

/// One paged action: page numbers from 1 until a short page.
struct Pager {
    action: &'static str,
    items_path: &'static str,
    page_size: u32,
}

impl Pager {
    async fn fetch_all(
        &self,
        invoker: &dyn Invoker,
        spec: &ListSpec,
        base: BTreeMap<String, String>,
        deadline: Instant,
    ) -> Result<Vec<Value>, ReconcileError> {
        let mut all_results = Vec::new();
        let mut page = 1u32;

        loop {
            let mut params = base.clone();
            params.insert("PageSize".to_string(), self.page_size.to_string());
            params.insert("PageNumber".to_string(), page.to_string());

            let remaining = deadline.saturating_duration_since(Instant::now());
            let payload = self.fetch_page(invoker, spec, params, remaining).await?;
            let page_items = match payload.get(self.items_path) {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            let count = page_items.len();
            all_results.extend(page_items);
            tracing::debug!(data_source = spec.type_name, action = self.action, page, count, "page fetched");

            if count < self.page_size as usize {
                break;
            }
            page += 1;
        }

        Ok(all_results)
    }

    async fn fetch_page(
        &self,
        invoker: &dyn Invoker,
        spec: &ListSpec,
        params: BTreeMap<String, String>,
        budget: Duration,
    ) -> Result<Payload, ReconcileError> {
        let request = RpcRequest::new(spec.product, self.action)
            .with_params(params)
            .with_error_codes(ErrorCodes::new(&spec.retryable_codes, &[]));

        retry(self.action, budget, &spec.backoff, move |remaining| {
            let request = request.clone();
            async move { invoker.invoke(&request, remaining).await }
        })
        .await
        .map_err(|err| ReconcileError::from_retry(self.action, spec.type_name, err))
    }
}

fn base_params(
    spec: &ListSpec,
    query: &ListQuery,
) -> Result<BTreeMap<String, String>, ReconcileError> {
    let mut params = BTreeMap::new();
    if let Some(param) = spec.ids_param
        && !query.ids.is_empty()
    {
        params.insert(param.to_string(), serde_json::to_string(&query.ids)?);
    }
    for (attr, param) in &spec.server_filters {
        if let Some(value) = query.exact.get(*attr).filter(|v| !v.is_empty()) {
            params.insert(param.to_string(), value.clone());
        }
    }
    for (i, (key, value)) in query.tags.iter().enumerate() {
        params.insert(format!("Tag.{}.Key", i + 1), key.clone());
        params.insert(format!("Tag.{}.Value", i + 1), value.clone());
    }
    Ok(params)
}

fn map_item(spec: &ListSpec, raw: &Value) -> ListedItem {
    let text = |path: &str| lookup(raw, path).and_then(scalar_to_string).unwrap_or_default();

    let mut attributes: Attributes = spec
        .attributes
        .iter()
        .map(|(name, path)| {
            let value = lookup(raw, path).cloned().unwrap_or(Value::Null);
            (name.to_string(), value)
        })
        .collect();
    if let Some(path) = spec.tags_path {
        let tags = lookup(raw, path)
            .map(|v| decode_tags(v).unwrap_or_default())
            .unwrap_or_default();
        attributes.insert("tags".to_string(), tags_to_attribute(&tags));
    }

    ListedItem {
        id: text(spec.id_field),
        name: text(spec.name_field),
        attributes,
    }
}
