//! Data-management service lookups. Both kinds are adopted by import and
//! never created or changed from here.

use crate::api::Product;
use crate::schema::{FieldKind, FieldSpec, Identity, ReadFrom, ReadSpec, ResourceSpec};

const DMS: Product = Product::new("dms-enterprise", "2018-11-01");

/// Registered database instance, identified by `host:port`.
pub fn dms_enterprise_instance() -> ResourceSpec {
    ResourceSpec::new(
        "alibabacloudstack_dms_enterprise_instance",
        DMS,
        Identity::Fields(&["host", "port"]),
        &["Host", "Port"],
        ReadSpec::new("GetInstance", &["Host", "Port"])
            .object("Instance")
            .not_found(&["InstanceNoEnoughNumber"]),
    )
    .with_field(
        FieldSpec::required("host", FieldKind::String)
            .read_from(ReadFrom::IdPart(0))
            .force_new(),
    )
    .with_field(
        FieldSpec::required("port", FieldKind::Int)
            .read_from(ReadFrom::IdPart(1))
            .force_new(),
    )
    .with_field(computed("instance_id", "InstanceId"))
    .with_field(computed("instance_name", "InstanceAlias"))
    .with_field(computed("instance_type", "InstanceType"))
    .with_field(computed("env_type", "EnvType"))
    .with_field(computed("database_user", "DatabaseUser"))
    .with_field(computed("dba_id", "DbaId"))
    .with_field(computed("state", "State"))
    .with_field(
        FieldSpec::computed("query_timeout", FieldKind::Int)
            .read_from(ReadFrom::Remote("QueryTimeout")),
    )
    .with_field(
        FieldSpec::computed("export_timeout", FieldKind::Int)
            .read_from(ReadFrom::Remote("ExportTimeout")),
    )
}

/// Console user, identified by its `Uid`.
pub fn dms_enterprise_user() -> ResourceSpec {
    ResourceSpec::new(
        "alibabacloudstack_dms_enterprise_user",
        DMS,
        Identity::Fields(&["uid"]),
        &["Uid"],
        ReadSpec::new("GetUser", &["Uid"]).object("User"),
    )
    .with_field(
        FieldSpec::required("uid", FieldKind::String)
            .read_from(ReadFrom::IdPart(0))
            .force_new(),
    )
    .with_field(computed("user_name", "NickName"))
    .with_field(computed("mobile", "Mobile"))
    .with_field(computed("status", "State"))
    .with_field(
        FieldSpec::computed("role_names", FieldKind::StringList)
            .read_from(ReadFrom::Remote("RoleNameList.RoleNames")),
    )
}

fn computed(name: &'static str, remote: &'static str) -> FieldSpec {
    FieldSpec::computed(name, FieldKind::String).read_from(ReadFrom::Remote(remote))
}
