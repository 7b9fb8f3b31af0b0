//! Per-kind resource descriptions.
//!
//! A [`ResourceSpec`] carries everything the generic reconciler needs to
//! drive one resource kind: its attributes, the remote actions for each
//! lifecycle step, how the identifier is formed, and which error codes the
//! kind treats specially.

use std::time::Duration;

use serde_json::Value;

use crate::api::{ErrorCodes, Product};
use crate::backoff::Backoff;
use crate::config::Timeouts;

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Bool,
    StringList,
    /// Unordered list of strings; order never counts as a change.
    StringSet,
    /// Key/value map sent as a JSON-encoded object string.
    Tags,
    /// JSON document held as a string; compared by value, not by text.
    Json,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "integer",
            Self::Bool => "bool",
            Self::StringList => "list of strings",
            Self::StringSet => "set of strings",
            Self::Tags => "map of strings",
            Self::Json => "JSON document",
        }
    }
}

/// Who supplies an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Set by the remote side only.
    Computed,
    /// Optional in configuration, filled in by the remote side when omitted.
    OptionalComputed,
}

/// Where a read finds an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFrom {
    /// Path relative to the described object.
    Remote(&'static str),
    /// Path relative to the whole response body.
    Root(&'static str),
    /// Part of the resource identifier.
    IdPart(usize),
    /// Never returned by the remote side; carried over from prior state.
    Declared,
}

/// Local constraint on a single attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    LenBetween(usize, usize),
    IntBetween(i64, i64),
    OneOf(&'static [&'static str]),
    /// Regular expression the whole value must match, with the message shown
    /// when it does not.
    Pattern(&'static str, &'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
    pub force_new: bool,
    pub sensitive: bool,
    pub default: Option<Value>,
    /// Request parameter the value is sent as on create and update.
    pub param: Option<&'static str>,
    pub read: ReadFrom,
    pub checks: Vec<Check>,
    /// Remote value to declared value, applied on read.
    pub translate: Vec<(&'static str, &'static str)>,
}

impl FieldSpec {
    fn new(name: &'static str, kind: FieldKind, presence: Presence) -> Self {
        Self {
            name,
            kind,
            presence,
            force_new: false,
            sensitive: false,
            default: None,
            param: None,
            read: ReadFrom::Declared,
            checks: Vec::new(),
            translate: Vec::new(),
        }
    }

    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::Required)
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::Optional)
    }

    pub fn computed(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::Computed)
    }

    pub fn optional_computed(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::OptionalComputed)
    }

    /// Send as `param` and read back from the same name on the described object.
    pub fn remote(mut self, param: &'static str) -> Self {
        self.param = Some(param);
        self.read = ReadFrom::Remote(param);
        self
    }

    pub fn param(mut self, param: &'static str) -> Self {
        self.param = Some(param);
        self
    }

    pub fn read_from(mut self, read: ReadFrom) -> Self {
        self.read = read;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn translate(mut self, pairs: &[(&'static str, &'static str)]) -> Self {
        self.translate = pairs.to_vec();
        self
    }

    pub fn is_computed_only(&self) -> bool {
        self.presence == Presence::Computed
    }

    /// Whether a change can be applied without replacing the resource.
    pub fn is_mutable(&self) -> bool {
        !self.force_new && !self.is_computed_only()
    }

    /// Map a remote value onto the declared vocabulary.
    pub fn translated<'a>(&self, remote: &'a str) -> &'a str {
        self.translate
            .iter()
            .find(|(from, _)| *from == remote)
            .map(|(_, to)| *to)
            .unwrap_or(remote)
    }
}

/// Constraint spanning several attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    AtLeastOneOf(&'static [&'static str]),
    /// An integer attribute that may only grow across updates.
    NonDecreasing(&'static str),
}

/// How the identifier of a new resource is formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Path into the create response.
    Response(&'static str),
    /// Declared attributes joined with the identifier separator.
    Fields(&'static [&'static str]),
}

impl Identity {
    pub fn part_count(&self) -> usize {
        match self {
            Self::Response(_) => 1,
            Self::Fields(fields) => fields.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSpec {
    pub action: &'static str,
    /// Send a fresh `ClientToken` on every attempt.
    pub client_token: bool,
}

impl CreateSpec {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            client_token: false,
        }
    }

    pub fn with_client_token(mut self) -> Self {
        self.client_token = true;
        self
    }
}

/// The describe call a read is answered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSpec {
    pub action: &'static str,
    /// Parameter names for the identifier parts, in order.
    pub id_params: Vec<&'static str>,
    /// Send the single identifier wrapped in a JSON list.
    pub id_as_list: bool,
    /// Path to the described object; empty means the whole body.
    pub object_path: &'static str,
    /// When the object path yields a list, pick the entry whose remote
    /// field equals the given identifier part.
    pub match_on: Option<(&'static str, usize)>,
    pub not_found_codes: Vec<&'static str>,
}

impl ReadSpec {
    pub fn new(action: &'static str, id_params: &[&'static str]) -> Self {
        Self {
            action,
            id_params: id_params.to_vec(),
            id_as_list: false,
            object_path: "",
            match_on: None,
            not_found_codes: Vec::new(),
        }
    }

    pub fn object(mut self, path: &'static str) -> Self {
        self.object_path = path;
        self
    }

    pub fn matching(mut self, remote: &'static str, id_part: usize) -> Self {
        self.match_on = Some((remote, id_part));
        self
    }

    pub fn id_as_list(mut self) -> Self {
        self.id_as_list = true;
        self
    }

    pub fn not_found(mut self, codes: &[&'static str]) -> Self {
        self.not_found_codes = codes.to_vec();
        self
    }
}

/// One parameter of an update action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateParam {
    /// Send the new value under the field's own parameter name.
    Value(&'static str),
    /// Send `new - old` of an integer field under `param`.
    Delta {
        field: &'static str,
        param: &'static str,
    },
}

impl UpdateParam {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Value(field) | Self::Delta { field, .. } => field,
        }
    }
}

/// An update action and the fields that trigger it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSpec {
    pub action: &'static str,
    pub params: Vec<UpdateParam>,
    /// Fields sent with the action whenever it fires, changed or not.
    pub carry: Vec<&'static str>,
    pub client_token: bool,
}

impl UpdateSpec {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            params: Vec::new(),
            carry: Vec::new(),
            client_token: false,
        }
    }

    pub fn field(mut self, field: &'static str) -> Self {
        self.params.push(UpdateParam::Value(field));
        self
    }

    pub fn delta(mut self, field: &'static str, param: &'static str) -> Self {
        self.params.push(UpdateParam::Delta { field, param });
        self
    }

    pub fn carry(mut self, field: &'static str) -> Self {
        self.carry.push(field);
        self
    }

    pub fn with_client_token(mut self) -> Self {
        self.client_token = true;
        self
    }

    pub fn triggers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().map(UpdateParam::field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSpec {
    pub action: &'static str,
    /// State attributes sent alongside the identifier parameters.
    pub fields: Vec<&'static str>,
    /// Codes meaning the object is already gone.
    pub absent_codes: Vec<&'static str>,
    /// Poll the describe call until the object disappears.
    pub wait_for_absence: bool,
}

impl DeleteSpec {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            fields: Vec::new(),
            absent_codes: Vec::new(),
            wait_for_absence: false,
        }
    }

    pub fn field(mut self, field: &'static str) -> Self {
        self.fields.push(field);
        self
    }

    pub fn absent(mut self, codes: &[&'static str]) -> Self {
        self.absent_codes = codes.to_vec();
        self
    }

    pub fn wait_for_absence(mut self) -> Self {
        self.wait_for_absence = true;
        self
    }
}

/// Tags applied through the shared tag actions instead of create and
/// update parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    /// Tag map attribute.
    pub field: &'static str,
    pub tag_action: &'static str,
    pub untag_action: &'static str,
    pub resource_type: &'static str,
    /// Identifier part sent as `ResourceId.1`.
    pub resource_part: usize,
    /// Other identifier parts, sent under their own parameter names.
    pub id_params: Vec<(&'static str, usize)>,
}

impl TagSpec {
    pub fn new(field: &'static str, resource_type: &'static str, resource_part: usize) -> Self {
        Self {
            field,
            tag_action: "TagResources",
            untag_action: "UntagResources",
            resource_type,
            resource_part,
            id_params: Vec::new(),
        }
    }

    pub fn id_param(mut self, param: &'static str, part: usize) -> Self {
        self.id_params.push((param, part));
        self
    }
}

/// Attribute value a freshly created resource must reach before it is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyCheck {
    pub attribute: &'static str,
    pub value: &'static str,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    pub type_name: &'static str,
    pub product: Product,
    pub fields: Vec<FieldSpec>,
    pub rules: Vec<Rule>,
    pub identity: Identity,
    /// Parameter names for the identifier parts on update and delete.
    pub id_params: Vec<&'static str>,
    pub create: Option<CreateSpec>,
    pub read: ReadSpec,
    pub updates: Vec<UpdateSpec>,
    pub delete: Option<DeleteSpec>,
    pub ready: Option<ReadyCheck>,
    pub tagging: Option<TagSpec>,
    pub retryable_codes: Vec<&'static str>,
    pub backoff: Backoff,
    pub timeouts: Timeouts,
}

impl ResourceSpec {
    pub fn new(
        type_name: &'static str,
        product: Product,
        identity: Identity,
        id_params: &[&'static str],
        read: ReadSpec,
    ) -> Self {
        Self {
            type_name,
            product,
            fields: Vec::new(),
            rules: Vec::new(),
            identity,
            id_params: id_params.to_vec(),
            create: None,
            read,
            updates: Vec::new(),
            delete: None,
            ready: None,
            tagging: None,
            retryable_codes: Vec::new(),
            backoff: Backoff::default(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_create(mut self, create: CreateSpec) -> Self {
        self.create = Some(create);
        self
    }

    pub fn with_update(mut self, update: UpdateSpec) -> Self {
        self.updates.push(update);
        self
    }

    pub fn with_delete(mut self, delete: DeleteSpec) -> Self {
        self.delete = Some(delete);
        self
    }

    pub fn with_ready(
        mut self,
        attribute: &'static str,
        value: &'static str,
        interval: Duration,
    ) -> Self {
        self.ready = Some(ReadyCheck {
            attribute,
            value,
            interval,
        });
        self
    }

    pub fn with_tagging(mut self, tagging: TagSpec) -> Self {
        self.tagging = Some(tagging);
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

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn id_part_count(&self) -> usize {
        self.identity.part_count()
    }

    /// Error codes for a call, with the kind's retryable codes and any
    /// action-specific not-found codes.
    pub fn error_codes(&self, not_found: &[&'static str]) -> ErrorCodes {
        ErrorCodes::new(&self.retryable_codes, not_found)
    }

    /// Whether any update action is triggered by `field`.
    pub fn is_updatable(&self, field: &str) -> bool {
        self.updates.iter().any(|u| u.triggers().any(|f| f == field))
    }
}
