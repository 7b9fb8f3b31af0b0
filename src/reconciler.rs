//! Generic create/read/update/delete over a [`ResourceSpec`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use uuid::Uuid;

use crate::api::{ApiError, Invoker, Payload, RpcRequest, lookup, scalar_to_string};
use crate::backoff::Backoff;
use crate::config::Timeouts;
use crate::error::ReconcileError;
use crate::plan::{AttributeChange, Plan, PlanAction};
use crate::resource::{Attributes, DeclaredResource, ResourceId, ResourceState, is_set};
use crate::retry::retry;
use crate::schema::{
    FieldKind, FieldSpec, Identity, Presence, ReadFrom, ResourceSpec, TagSpec, UpdateParam,
};
use crate::tags::{Tags, decode_tags, encode_tags, tags_to_attribute};
use crate::validation::{apply_defaults, as_int, check_transition, validate};

/// Drives one resource kind against a remote invoker.
///
/// Every remote call runs under the retry loop with the kind's backoff and
/// the timeout budget of the operation it belongs to.
pub struct Reconciler<'a> {
    invoker: &'a dyn Invoker,
    spec: &'a ResourceSpec,
    timeouts: Timeouts,
    backoff: Backoff,
}

impl<'a> Reconciler<'a> {
    pub fn new(invoker: &'a dyn Invoker, spec: &'a ResourceSpec) -> Self {
        Self {
            invoker,
            spec,
            timeouts: spec.timeouts,
            backoff: spec.backoff,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn spec(&self) -> &ResourceSpec {
        self.spec
    }

    /// Create the remote resource and return its refreshed state.
    pub async fn create(&self, declared: &DeclaredResource) -> Result<ResourceState, ReconcileError> {
        let create = self
            .spec
            .create
            .as_ref()
            .ok_or_else(|| self.unsupported("create"))?;
        validate(self.spec, declared)?;
        let declared = apply_defaults(self.spec, declared);

        let mut params = BTreeMap::new();
        for field in &self.spec.fields {
            if field.is_computed_only() {
                continue;
            }
            if let (Some(param), Some(value)) = (field.param, declared.get(field.name)) {
                encode_param(field.kind, param, value, &mut params)?;
            }
        }

        let started = Instant::now();
        let payload = self
            .call(
                create.action,
                self.spec.type_name,
                params,
                &[],
                create.client_token,
                self.timeouts.create,
            )
            .await?;
        let id = self.identity(create.action, &declared, &payload)?;
        tracing::info!(resource_type = self.spec.type_name, id = %id, "resource created");

        if let Some(ready) = &self.spec.ready {
            let budget = self.timeouts.create.saturating_sub(started.elapsed());
            let (attribute, target) = (ready.attribute, ready.value);
            self.wait_until(
                &id,
                declared.attributes(),
                budget,
                Some(ready.interval),
                "wait for ready",
                |state| {
                    state
                        .and_then(|s| s.get(attribute))
                        .and_then(scalar_to_string)
                        .is_some_and(|v| v == target)
                },
            )
            .await?;
        }

        if let Some(tagging) = &self.spec.tagging {
            let tags = declared_tags(&declared, tagging)?;
            let budget = self.timeouts.create.saturating_sub(started.elapsed());
            self.retag(tagging, &id, &Tags::new(), &tags, budget).await?;
        }

        self.read_with(&id, Some(declared.attributes()), self.timeouts.read)
            .await?
            .ok_or_else(|| self.not_found(&id))
    }

    /// Refresh state for `id`. `Ok(None)` means the remote object is gone.
    ///
    /// Attributes the remote side never returns are carried over from `prior`.
    pub async fn read(
        &self,
        id: &ResourceId,
        prior: Option<&Attributes>,
    ) -> Result<Option<ResourceState>, ReconcileError> {
        self.read_with(id, prior, self.timeouts.read).await
    }

    /// Adopt an existing remote object by identifier.
    pub async fn import(&self, id: &ResourceId) -> Result<ResourceState, ReconcileError> {
        let state = self
            .read(id, None)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        tracing::info!(resource_type = self.spec.type_name, id = %id, "resource imported");
        Ok(state)
    }

    /// Apply the differences between `prior` and `declared`.
    ///
    /// Only update actions triggered by a changed attribute are called; with
    /// nothing to change the prior state is returned without any remote call.
    pub async fn update(
        &self,
        prior: &ResourceState,
        declared: &DeclaredResource,
    ) -> Result<ResourceState, ReconcileError> {
        validate(self.spec, declared)?;
        let declared = apply_defaults(self.spec, declared);
        let changes = diff(self.spec, &prior.attributes, &declared);

        if let Some(change) = changes.iter().find(|c| c.requires_replace) {
            return Err(ReconcileError::validation(
                self.spec.type_name,
                format!("changing '{}' requires replacing the resource", change.name),
            ));
        }
        check_transition(self.spec, &prior.attributes, &declared)?;

        let changed = |name: &str| changes.iter().any(|c| c.name == name);
        let parts = prior.id.parts(self.spec.id_part_count())?;
        let mut calls = 0;

        for update in &self.spec.updates {
            let fired: Vec<&UpdateParam> = update
                .params
                .iter()
                .filter(|p| changed(p.field()))
                .collect();
            if fired.is_empty() {
                continue;
            }

            let mut params = self.id_params(&self.spec.id_params, &parts);
            for param in fired {
                match param {
                    UpdateParam::Value(name) => {
                        let Some(field) = self.spec.field(name) else {
                            continue;
                        };
                        let Some(remote) = field.param else {
                            continue;
                        };
                        match (field.kind, declared.get(name)) {
                            // an emptied map goes out as "{}" to clear the remote tags
                            (FieldKind::Tags, value) => {
                                let tags = value.map(decode_tags).transpose()?.unwrap_or_default();
                                params.insert(remote.to_string(), encode_tags(&tags)?);
                            }
                            (kind, Some(value)) => encode_param(kind, remote, value, &mut params)?,
                            (_, None) => {
                                params.insert(remote.to_string(), String::new());
                            }
                        }
                    }
                    UpdateParam::Delta { field, param } => {
                        let old = prior.get(field).and_then(as_int).unwrap_or(0);
                        let new = declared.get(field).and_then(as_int).unwrap_or(0);
                        params.insert(param.to_string(), (new - old).to_string());
                    }
                }
            }
            for name in &update.carry {
                if let Some(field) = self.spec.field(name)
                    && let (Some(remote), Some(value)) = (field.param, declared.get(name))
                {
                    encode_param(field.kind, remote, value, &mut params)?;
                }
            }

            self.call(
                update.action,
                prior.id.as_str(),
                params,
                &[],
                update.client_token,
                self.timeouts.update,
            )
            .await?;
            calls += 1;
        }

        if let Some(tagging) = &self.spec.tagging
            && changed(tagging.field)
        {
            let old = match prior.get(tagging.field) {
                Some(value) => decode_tags(value)?,
                None => Tags::new(),
            };
            let new = declared_tags(&declared, tagging)?;
            calls += self
                .retag(tagging, &prior.id, &old, &new, self.timeouts.update)
                .await?;
        }

        let mut carried = prior.attributes.clone();
        for change in &changes {
            carried.insert(
                change.name.clone(),
                change.after.clone().unwrap_or(Value::Null),
            );
        }

        if calls == 0 {
            tracing::debug!(resource_type = self.spec.type_name, id = %prior.id, "no remote changes");
            return Ok(ResourceState::new(
                self.spec.type_name,
                prior.id.clone(),
                carried,
            ));
        }

        tracing::info!(resource_type = self.spec.type_name, id = %prior.id, calls, "resource updated");
        self.read_with(&prior.id, Some(&carried), self.timeouts.read)
            .await?
            .ok_or_else(|| self.not_found(&prior.id))
    }

    /// Remove the remote resource. An object that is already gone counts as
    /// deleted, so repeating a delete is harmless.
    pub async fn delete(&self, state: &ResourceState) -> Result<(), ReconcileError> {
        let Some(delete) = &self.spec.delete else {
            tracing::warn!(
                resource_type = self.spec.type_name,
                id = %state.id,
                "no remote delete for this kind, removing from state only"
            );
            return Ok(());
        };

        let parts = state.id.parts(self.spec.id_part_count())?;
        let mut params = self.id_params(&self.spec.id_params, &parts);
        for name in &delete.fields {
            if let Some(field) = self.spec.field(name)
                && let (Some(remote), Some(value)) = (field.param, state.get(name))
            {
                encode_param(field.kind, remote, value, &mut params)?;
            }
        }

        let started = Instant::now();
        match self
            .call(
                delete.action,
                state.id.as_str(),
                params,
                &delete.absent_codes,
                false,
                self.timeouts.delete,
            )
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                tracing::debug!(resource_type = self.spec.type_name, id = %state.id, "already absent");
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        if delete.wait_for_absence {
            let budget = self.timeouts.delete.saturating_sub(started.elapsed());
            self.wait_until(
                &state.id,
                &state.attributes,
                budget,
                None,
                "wait for deletion",
                |s| s.is_none(),
            )
            .await?;
        }

        tracing::info!(resource_type = self.spec.type_name, id = %state.id, "resource deleted");
        Ok(())
    }

    /// Compare declared state with prior state without touching the remote side.
    pub fn plan(
        &self,
        prior: Option<&ResourceState>,
        declared: &DeclaredResource,
    ) -> Result<Plan, ReconcileError> {
        plan(self.spec, prior, declared)
    }

    /// Move the remote tags from `old` to `new`: removed keys are untagged,
    /// added and changed ones tagged. Returns the number of calls made.
    async fn retag(
        &self,
        tagging: &TagSpec,
        id: &ResourceId,
        old: &Tags,
        new: &Tags,
        budget: Duration,
    ) -> Result<u32, ReconcileError> {
        let parts = id.parts(self.spec.id_part_count())?;
        let mut base = BTreeMap::new();
        base.insert("ResourceType".to_string(), tagging.resource_type.to_string());
        if let Some(part) = parts.get(tagging.resource_part) {
            base.insert("ResourceId.1".to_string(), part.to_string());
        }
        for (param, i) in &tagging.id_params {
            if let Some(part) = parts.get(*i) {
                base.insert(param.to_string(), part.to_string());
            }
        }

        let started = Instant::now();
        let mut calls = 0;

        let removed: Vec<&String> = old.keys().filter(|k| !new.contains_key(*k)).collect();
        if !removed.is_empty() {
            let mut params = base.clone();
            for (i, key) in removed.iter().enumerate() {
                params.insert(format!("TagKey.{}", i + 1), key.to_string());
            }
            self.call(tagging.untag_action, id.as_str(), params, &[], false, budget)
                .await?;
            calls += 1;
        }

        let added: Vec<(&String, &String)> = new
            .iter()
            .filter(|(k, v)| old.get(*k) != Some(*v))
            .collect();
        if !added.is_empty() {
            let mut params = base;
            for (i, (key, value)) in added.iter().enumerate() {
                params.insert(format!("Tag.{}.Key", i + 1), key.to_string());
                params.insert(format!("Tag.{}.Value", i + 1), value.to_string());
            }
            let remaining = budget.saturating_sub(started.elapsed());
            self.call(tagging.tag_action, id.as_str(), params, &[], false, remaining)
                .await?;
            calls += 1;
        }

        tracing::debug!(
            resource_type = self.spec.type_name,
            id = %id,
            removed = removed.len(),
            added = added.len(),
            "tags applied"
        );
        Ok(calls)
    }

    async fn read_with(
        &self,
        id: &ResourceId,
        prior: Option<&Attributes>,
        budget: Duration,
    ) -> Result<Option<ResourceState>, ReconcileError> {
        let parts = id.parts(self.spec.id_part_count())?;
        let Some((payload, object)) = self.describe(id, &parts, budget).await? else {
            tracing::debug!(resource_type = self.spec.type_name, id = %id, "remote object absent");
            return Ok(None);
        };

        let mut attributes = Attributes::new();
        for field in &self.spec.fields {
            let carried = || prior.and_then(|p| p.get(field.name)).cloned();
            let value = if field.sensitive {
                carried()
            } else {
                match field.read {
                    ReadFrom::Remote(path) => lookup(&object, path).cloned(),
                    ReadFrom::Root(path) => payload.get(path).cloned(),
                    ReadFrom::IdPart(i) => parts.get(i).map(|p| Value::String(p.to_string())),
                    ReadFrom::Declared => carried(),
                }
            };
            let value = match value {
                Some(v) if field.sensitive || field.read == ReadFrom::Declared => v,
                Some(v) => normalize(field, v),
                None => Value::Null,
            };
            attributes.insert(field.name.to_string(), value);
        }

        Ok(Some(ResourceState::new(
            self.spec.type_name,
            id.clone(),
            attributes,
        )))
    }

    /// Run the describe call and pick out the described object.
    async fn describe(
        &self,
        id: &ResourceId,
        parts: &[&str],
        budget: Duration,
    ) -> Result<Option<(Payload, Value)>, ReconcileError> {
        let read = &self.spec.read;
        let params = if read.id_as_list {
            let mut params = BTreeMap::new();
            if let Some(name) = read.id_params.first() {
                params.insert(name.to_string(), serde_json::to_string(&[id.as_str()])?);
            }
            params
        } else {
            self.id_params(&read.id_params, parts)
        };

        let payload = match self
            .call(read.action, id.as_str(), params, &read.not_found_codes, false, budget)
            .await
        {
            Ok(payload) => payload,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        let object = match (lookup(payload.body(), read.object_path), read.match_on) {
            (Some(Value::Array(items)), Some((remote, part))) => {
                let wanted = parts.get(part).copied();
                items
                    .iter()
                    .find(|item| {
                        lookup(item, remote).and_then(scalar_to_string).as_deref() == wanted
                    })
                    .cloned()
            }
            (Some(Value::Array(items)), None) => items.first().cloned(),
            (Some(Value::Object(map)), _) if map.is_empty() => None,
            (Some(Value::Null), _) | (None, _) => None,
            (Some(object), _) => Some(object.clone()),
        };
        Ok(object.map(|o| (payload, o)))
    }

    /// Poll the describe call until `done` holds or the budget runs out.
    async fn wait_until<F>(
        &self,
        id: &ResourceId,
        prior: &Attributes,
        budget: Duration,
        interval: Option<Duration>,
        purpose: &str,
        done: F,
    ) -> Result<(), ReconcileError>
    where
        F: Fn(Option<&ResourceState>) -> bool,
    {
        let started = Instant::now();
        let mut polls = 0u32;
        loop {
            let remaining = budget.saturating_sub(started.elapsed());
            let state = self.read_with(id, Some(prior), remaining).await?;
            polls += 1;
            if done(state.as_ref()) {
                return Ok(());
            }

            let wait = interval.unwrap_or_else(|| self.backoff.next_wait(polls - 1));
            if started.elapsed() + wait >= budget {
                return Err(ReconcileError::Timeout {
                    action: purpose.to_string(),
                    target: id.to_string(),
                    attempts: polls,
                    source: ApiError::Timeout {
                        action: self.spec.read.action.to_string(),
                        timeout: budget,
                    },
                });
            }
            tracing::debug!(resource_type = self.spec.type_name, id = %id, polls, ?wait, "{}", purpose);
            tokio::time::sleep(wait).await;
        }
    }

    /// One remote action under the retry loop.
    async fn call(
        &self,
        action: &str,
        target: &str,
        params: BTreeMap<String, String>,
        not_found: &[&'static str],
        client_token: bool,
        budget: Duration,
    ) -> Result<Payload, ReconcileError> {
        let base = RpcRequest::new(self.spec.product, action)
            .with_params(params)
            .with_error_codes(self.spec.error_codes(not_found));
        let invoker = self.invoker;

        retry(action, budget, &self.backoff, move |remaining| {
            let mut request = base.clone();
            if client_token {
                request
                    .params
                    .insert("ClientToken".to_string(), Uuid::new_v4().to_string());
            }
            async move { invoker.invoke(&request, remaining).await }
        })
        .await
        .map_err(|err| ReconcileError::from_retry(action, target, err))
    }

    fn identity(
        &self,
        action: &str,
        declared: &DeclaredResource,
        payload: &Payload,
    ) -> Result<ResourceId, ReconcileError> {
        match &self.spec.identity {
            Identity::Response(path) => payload
                .get_string(path)
                .filter(|id| !id.is_empty())
                .map(ResourceId::new)
                .ok_or_else(|| ReconcileError::MissingField {
                    action: action.to_string(),
                    target: self.spec.type_name.to_string(),
                    path: path.to_string(),
                }),
            Identity::Fields(fields) => {
                let parts = fields
                    .iter()
                    .map(|name| {
                        declared.get(name).and_then(scalar_to_string).ok_or_else(|| {
                            ReconcileError::validation(
                                self.spec.type_name,
                                format!("'{}' is needed to form the identifier", name),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
                Ok(ResourceId::from_parts(&parts))
            }
        }
    }

    fn id_params(&self, names: &[&'static str], parts: &[&str]) -> BTreeMap<String, String> {
        names
            .iter()
            .zip(parts)
            .map(|(name, part)| (name.to_string(), part.to_string()))
            .collect()
    }

    fn not_found(&self, id: &ResourceId) -> ReconcileError {
        ReconcileError::NotFound {
            resource_type: self.spec.type_name.to_string(),
            id: id.to_string(),
        }
    }

    fn unsupported(&self, operation: &'static str) -> ReconcileError {
        ReconcileError::Unsupported {
            resource_type: self.spec.type_name.to_string(),
            operation,
        }
    }
}

/// Plan the move from `prior` to `declared` for `spec`. Nothing is sent
/// anywhere, so no invoker or credentials are involved.
pub fn plan(
    spec: &ResourceSpec,
    prior: Option<&ResourceState>,
    declared: &DeclaredResource,
) -> Result<Plan, ReconcileError> {
    validate(spec, declared)?;
    let declared = apply_defaults(spec, declared);

    let Some(prior) = prior else {
        if spec.create.is_none() {
            return Err(ReconcileError::Unsupported {
                resource_type: spec.type_name.to_string(),
                operation: "create",
            });
        }
        let changes = spec
            .fields
            .iter()
            .filter_map(|f| {
                declared
                    .get(f.name)
                    .map(|v| AttributeChange::added(f.name, v.clone()))
            })
            .collect();
        return Ok(Plan {
            resource_type: spec.type_name.to_string(),
            action: PlanAction::Create,
            changes,
        });
    };

    let changes = diff(spec, &prior.attributes, &declared);
    if !changes.iter().any(|c| c.requires_replace) {
        check_transition(spec, &prior.attributes, &declared)?;
    }
    let action = if changes.is_empty() {
        PlanAction::NoOp
    } else if changes.iter().any(|c| c.requires_replace) {
        PlanAction::Replace
    } else {
        PlanAction::Update
    };
    Ok(Plan {
        resource_type: spec.type_name.to_string(),
        action,
        changes,
    })
}

/// Changed configurable attributes, in schema order.
fn diff(spec: &ResourceSpec, prior: &Attributes, declared: &DeclaredResource) -> Vec<AttributeChange> {
    spec.fields
        .iter()
        .filter(|f| !f.is_computed_only())
        .filter_map(|field| {
            let before = prior.get(field.name).filter(|v| is_set(v));
            let after = declared.get(field.name);
            if after.is_none() && field.presence == Presence::OptionalComputed {
                return None;
            }
            if same_value(field.kind, before, after) {
                return None;
            }
            Some(AttributeChange::modified(
                field.name,
                before.cloned(),
                after.cloned(),
                replaces_on_change(spec, field),
            ))
        })
        .collect()
}

/// A change that no update action can apply in place forces replacement.
/// Attributes that are never sent to the remote side change locally.
fn replaces_on_change(spec: &ResourceSpec, field: &FieldSpec) -> bool {
    if field.force_new {
        return true;
    }
    field.param.is_some()
        && field.read != ReadFrom::Declared
        && !spec.is_updatable(field.name)
        && !is_delete_only(spec, field)
}

fn is_delete_only(spec: &ResourceSpec, field: &FieldSpec) -> bool {
    spec.delete
        .as_ref()
        .is_some_and(|d| d.fields.contains(&field.name))
}

fn declared_tags(declared: &DeclaredResource, tagging: &TagSpec) -> Result<Tags, ReconcileError> {
    match declared.get(tagging.field) {
        Some(value) => Ok(decode_tags(value)?),
        None => Ok(Tags::new()),
    }
}

/// Render a declared value as request parameters.
///
/// String lists expand to `Param.1`, `Param.2`, ...; tags travel as a
/// JSON-encoded object string.
pub fn encode_param(
    kind: FieldKind,
    param: &str,
    value: &Value,
    params: &mut BTreeMap<String, String>,
) -> Result<(), ReconcileError> {
    match kind {
        FieldKind::StringList | FieldKind::StringSet => {
            let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
            for (i, item) in items.iter().enumerate() {
                if let Some(item) = scalar_to_string(item) {
                    params.insert(format!("{}.{}", param, i + 1), item);
                }
            }
        }
        FieldKind::Tags => {
            let tags = decode_tags(value)?;
            if !tags.is_empty() {
                params.insert(param.to_string(), encode_tags(&tags)?);
            }
        }
        FieldKind::Json => {
            let text = match value {
                Value::String(s) => s.clone(),
                other => serde_json::to_string(other)?,
            };
            params.insert(param.to_string(), text);
        }
        FieldKind::String | FieldKind::Int | FieldKind::Bool => {
            if let Some(text) = scalar_to_string(value) {
                params.insert(param.to_string(), text);
            }
        }
    }
    Ok(())
}

/// Coerce a remote value into the declared representation of `field`.
fn normalize(field: &FieldSpec, value: Value) -> Value {
    match field.kind {
        FieldKind::Int => as_int(&value).map(Value::from).unwrap_or(value),
        FieldKind::Bool => {
            let parsed = value.as_str().and_then(|s| s.parse::<bool>().ok());
            parsed.map(Value::Bool).unwrap_or(value)
        }
        FieldKind::String => match scalar_to_string(&value) {
            Some(text) => Value::String(field.translated(&text).to_string()),
            None => value,
        },
        FieldKind::Tags => match decode_tags(&value) {
            Ok(tags) => tags_to_attribute(&tags),
            Err(err) => {
                tracing::warn!(field = field.name, error = %err, "unreadable tags");
                value
            }
        },
        FieldKind::Json => match value {
            Value::String(_) | Value::Null => value,
            other => Value::String(other.to_string()),
        },
        FieldKind::StringList | FieldKind::StringSet => match value {
            Value::Array(_) => value,
            Value::Null => Value::Array(Vec::new()),
            other => Value::Array(vec![other]),
        },
    }
}

/// Equality in the declared vocabulary. Unset on both sides is equal, JSON
/// documents compare by value, integers by number and tags by content.
/// An unset tag map equals an empty one.
fn same_value(kind: FieldKind, before: Option<&Value>, after: Option<&Value>) -> bool {
    if kind == FieldKind::Tags {
        let content = |v: Option<&Value>| match v {
            Some(v) => decode_tags(v).ok(),
            None => Some(Tags::new()),
        };
        if let (Some(b), Some(a)) = (content(before), content(after)) {
            return b == a;
        }
    }
    let (before, after) = match (before, after) {
        (None, None) => return true,
        (Some(b), Some(a)) => (b, a),
        _ => return false,
    };
    match kind {
        FieldKind::Json => {
            let parse = |v: &Value| match v {
                Value::String(s) => serde_json::from_str::<Value>(s).ok(),
                other => Some(other.clone()),
            };
            match (parse(before), parse(after)) {
                (Some(b), Some(a)) => b == a,
                _ => before == after,
            }
        }
        FieldKind::Int => match (as_int(before), as_int(after)) {
            (Some(b), Some(a)) => b == a,
            _ => before == after,
        },
        FieldKind::Tags => match (decode_tags(before), decode_tags(after)) {
            (Ok(b), Ok(a)) => b == a,
            _ => before == after,
        },
        FieldKind::String => scalar_to_string(before) == scalar_to_string(after),
        FieldKind::StringSet => {
            let sorted = |v: &Value| {
                let mut items: Vec<String> = v
                    .as_array()
                    .map(|items| items.iter().filter_map(scalar_to_string).collect())
                    .unwrap_or_default();
                items.sort();
                items
            };
            sorted(before) == sorted(after)
        }
        FieldKind::Bool | FieldKind::StringList => before == after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Product;
    use crate::schema::{CreateSpec, DeleteSpec, ReadSpec, Rule, UpdateSpec};
    use crate::testing::ScriptedInvoker;
    use serde_json::json;

    const KAFKA: Product = Product::new("alikafka", "2019-09-16");

    fn topic_spec() -> ResourceSpec {
        ResourceSpec::new(
            "alibabacloudstack_alikafka_topic",
            KAFKA,
            Identity::Fields(&["instance_id", "topic"]),
            &["InstanceId", "Topic"],
            ReadSpec::new("GetTopicList", &["InstanceId", "Topic"])
                .object("TopicList.TopicVO")
                .matching("Topic", 1),
        )
        .with_field(
            FieldSpec::required("instance_id", FieldKind::String)
                .remote("InstanceId")
                .force_new(),
        )
        .with_field(
            FieldSpec::required("topic", FieldKind::String)
                .remote("Topic")
                .force_new(),
        )
        .with_field(
            FieldSpec::optional("partition_num", FieldKind::Int)
                .remote("PartitionNum")
                .default(12),
        )
        .with_field(FieldSpec::required("remark", FieldKind::String).remote("Remark"))
        .with_rule(Rule::NonDecreasing("partition_num"))
        .with_create(CreateSpec::new("CreateTopic"))
        .with_update(UpdateSpec::new("ModifyTopicRemark").field("remark"))
        .with_update(UpdateSpec::new("ModifyPartitionNum").delta("partition_num", "AddPartitionNum"))
        .with_delete(DeleteSpec::new("DeleteTopic"))
        .with_retryable(&["Throttling.User", "ONS_SYSTEM_FLOW_CONTROL"])
        .with_backoff(Backoff::fixed(Duration::from_secs(1)))
        .with_timeouts(Timeouts::uniform(Duration::from_secs(10)))
    }

    fn topic_list(partitions: i64, remark: &str) -> Value {
        json!({
            "RequestId": "req",
            "TopicList": {"TopicVO": [
                {"InstanceId": "alikafka-1", "Topic": "other", "PartitionNum": 1, "Remark": "x"},
                {"InstanceId": "alikafka-1", "Topic": "orders", "PartitionNum": partitions.to_string(), "Remark": remark}
            ]}
        })
    }

    fn declared(partitions: i64, remark: &str) -> DeclaredResource {
        DeclaredResource::new()
            .with("instance_id", "alikafka-1")
            .with("topic", "orders")
            .with("partition_num", partitions)
            .with("remark", remark)
    }

    fn prior(partitions: i64) -> ResourceState {
        ResourceState::new(
            "alibabacloudstack_alikafka_topic",
            ResourceId::new("alikafka-1:orders"),
            json!({
                "instance_id": "alikafka-1",
                "topic": "orders",
                "partition_num": partitions,
                "remark": "orders topic"
            })
            .as_object()
            .unwrap()
            .clone(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_then_read_returns_declared_inputs() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        invoker
            .reply("CreateTopic", json!({"RequestId": "r1", "Success": true}))
            .always("GetTopicList", topic_list(12, "orders topic"));

        let state = Reconciler::new(&invoker, &spec)
            .create(&declared(12, "orders topic"))
            .await
            .unwrap();

        assert_eq!(state.id.as_str(), "alikafka-1:orders");
        assert_eq!(state.get("partition_num"), Some(&json!(12)));
        assert_eq!(state.get("remark"), Some(&json!("orders topic")));
        assert_eq!(state.get("topic"), Some(&json!("orders")));

        let create = &invoker.calls_to("CreateTopic")[0];
        assert_eq!(create.params["InstanceId"], "alikafka-1");
        assert_eq!(create.params["PartitionNum"], "12");
        assert!(!create.params.contains_key("ClientToken"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_applies_defaults_and_retries_throttling() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        invoker
            .fail("CreateTopic", 400, "ONS_SYSTEM_FLOW_CONTROL")
            .reply("CreateTopic", json!({"Success": true}))
            .always("GetTopicList", topic_list(12, "r"));

        let declared = DeclaredResource::new()
            .with("instance_id", "alikafka-1")
            .with("topic", "orders")
            .with("remark", "r");
        Reconciler::new(&invoker, &spec).create(&declared).await.unwrap();

        assert_eq!(invoker.call_count("CreateTopic"), 2);
        assert_eq!(invoker.calls_to("CreateTopic")[1].params["PartitionNum"], "12");
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_fatal_error_surfaces_without_id() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        invoker.fail("CreateTopic", 400, "InvalidParameter");

        let err = Reconciler::new(&invoker, &spec)
            .create(&declared(12, "r"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Remote { ref action, .. } if action == "CreateTopic"));
        assert_eq!(invoker.call_count("GetTopicList"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_exhausted_budget_is_timeout() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        invoker.always_fail("CreateTopic", 400, "Throttling.User");

        let err = Reconciler::new(&invoker, &spec)
            .with_backoff(Backoff::fixed(Duration::from_secs(3)))
            .create(&declared(12, "r"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Timeout { attempts: 4, .. }));
        assert_eq!(invoker.call_count("CreateTopic"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partition_decrease_rejected_without_calls() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();

        let err = Reconciler::new(&invoker, &spec)
            .update(&prior(12), &declared(6, "orders topic"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("partition_num"));
        assert_eq!(invoker.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partition_increase_sends_delta_once() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        invoker
            .reply("ModifyPartitionNum", json!({"Success": true}))
            .always("GetTopicList", topic_list(24, "orders topic"));

        let state = Reconciler::new(&invoker, &spec)
            .update(&prior(12), &declared(24, "orders topic"))
            .await
            .unwrap();

        let modify = invoker.calls_to("ModifyPartitionNum");
        assert_eq!(modify.len(), 1);
        assert_eq!(modify[0].params["AddPartitionNum"], "12");
        assert_eq!(modify[0].params["InstanceId"], "alikafka-1");
        assert_eq!(modify[0].params["Topic"], "orders");
        assert_eq!(invoker.call_count("ModifyTopicRemark"), 0);
        assert_eq!(state.get("partition_num"), Some(&json!(24)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_noop_update_makes_zero_calls() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();

        let state = Reconciler::new(&invoker, &spec)
            .update(&prior(12), &declared(12, "orders topic"))
            .await
            .unwrap();
        assert_eq!(invoker.total_calls(), 0);
        assert_eq!(state, prior(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_new_change_is_rejected() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        let declared = declared(12, "orders topic").with("topic", "payments");

        let err = Reconciler::new(&invoker, &spec)
            .update(&prior(12), &declared)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("changing 'topic' requires replacing"));
        assert_eq!(invoker.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_is_idempotent() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        invoker
            .reply("DeleteTopic", json!({"Success": true}))
            .fail("DeleteTopic", 404, "TopicNotFound");
        let reconciler = Reconciler::new(&invoker, &spec);

        reconciler.delete(&prior(12)).await.unwrap();
        reconciler.delete(&prior(12)).await.unwrap();
        assert_eq!(invoker.call_count("DeleteTopic"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_for_absence() {
        let spec = topic_spec().with_delete(DeleteSpec::new("DeleteTopic").wait_for_absence());
        let invoker = ScriptedInvoker::new();
        invoker
            .reply("DeleteTopic", json!({"Success": true}))
            .reply("GetTopicList", topic_list(12, "r"))
            .always("GetTopicList", json!({"TopicList": {"TopicVO": []}}));

        Reconciler::new(&invoker, &spec).delete(&prior(12)).await.unwrap();
        assert_eq!(invoker.call_count("GetTopicList"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_absent_and_import_not_found() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        invoker.always("GetTopicList", json!({"TopicList": {"TopicVO": []}}));
        let reconciler = Reconciler::new(&invoker, &spec);

        let id = ResourceId::new("alikafka-1:orders");
        assert!(reconciler.read(&id, None).await.unwrap().is_none());
        let err = reconciler.import(&id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_rejects_malformed_id() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        let err = Reconciler::new(&invoker, &spec)
            .read(&ResourceId::new("alikafka-1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedId { expected: 2, .. }));
        assert_eq!(invoker.total_calls(), 0);
    }

    #[test]
    fn test_plan_actions() {
        let spec = topic_spec();

        let created = plan(&spec, None, &declared(12, "r")).unwrap();
        assert_eq!(created.action, PlanAction::Create);

        let noop = plan(&spec, Some(&prior(12)), &declared(12, "orders topic")).unwrap();
        assert!(noop.is_noop());

        let update = plan(&spec, Some(&prior(12)), &declared(24, "new remark")).unwrap();
        assert_eq!(update.action, PlanAction::Update);
        assert_eq!(update.changes.len(), 2);

        let replace = plan(
            &spec,
            Some(&prior(12)),
            &declared(12, "orders topic").with("topic", "x"),
        )
        .unwrap();
        assert!(replace.requires_replace());

        assert!(plan(&spec, Some(&prior(12)), &declared(6, "r")).is_err());
    }

    #[test]
    fn test_reconciler_plan_matches_offline_plan_without_calls() {
        let spec = topic_spec();
        let invoker = ScriptedInvoker::new();
        let declared = declared(24, "new remark");

        let online = Reconciler::new(&invoker, &spec)
            .plan(Some(&prior(12)), &declared)
            .unwrap();
        assert_eq!(online, plan(&spec, Some(&prior(12)), &declared).unwrap());
        assert_eq!(invoker.total_calls(), 0);
    }

    #[test]
    fn test_json_documents_compare_by_value() {
        let before = json!("{\"a\": 1, \"b\": [1, 2]}");
        let after = json!("{\"b\":[1,2],\"a\":1}");
        assert!(same_value(FieldKind::Json, Some(&before), Some(&after)));
        assert!(!same_value(FieldKind::Json, Some(&before), Some(&json!("{}"))));
    }

    #[test]
    fn test_string_sets_ignore_order() {
        let before = json!(["10.0.0.1", "10.0.0.2"]);
        let after = json!(["10.0.0.2", "10.0.0.1"]);
        assert!(same_value(FieldKind::StringSet, Some(&before), Some(&after)));
        assert!(!same_value(FieldKind::StringList, Some(&before), Some(&after)));
    }

    #[test]
    fn test_encode_param_shapes() {
        let mut params = BTreeMap::new();
        let list = json!(["10.0.0.1", "10.0.0.2"]);
        encode_param(FieldKind::StringList, "MachineList", &list, &mut params).unwrap();
        encode_param(FieldKind::Bool, "LocalTopic", &json!(false), &mut params).unwrap();
        encode_param(FieldKind::Tags, "Tags", &json!({"env": "prod"}), &mut params).unwrap();
        encode_param(FieldKind::Int, "Bandwidth", &json!(20), &mut params).unwrap();

        assert_eq!(params["MachineList.1"], "10.0.0.1");
        assert_eq!(params["MachineList.2"], "10.0.0.2");
        assert_eq!(params["LocalTopic"], "false");
        assert_eq!(params["Tags"], "{\"env\":\"prod\"}");
        assert_eq!(params["Bandwidth"], "20");
    }
}
