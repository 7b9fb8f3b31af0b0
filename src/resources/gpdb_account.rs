use std::time::Duration;

use crate::api::Product;
use crate::config::Timeouts;
use crate::schema::{
    Check, CreateSpec, FieldKind, FieldSpec, Identity, ReadFrom, ReadSpec, ResourceSpec,
    UpdateSpec,
};

const GPDB: Product = Product::new("gpdb", "2016-05-03");

/// Analytic-database account, identified by `db_instance_id:account_name`.
///
/// The service offers no account deletion; removing one only drops it from
/// state. The password is never returned and is carried over on every read.
pub fn gpdb_account() -> ResourceSpec {
    ResourceSpec::new(
        "alibabacloudstack_gpdb_account",
        GPDB,
        Identity::Fields(&["db_instance_id", "account_name"]),
        &["DBInstanceId", "AccountName"],
        ReadSpec::new("DescribeAccounts", &["DBInstanceId", "AccountName"])
            .object("Accounts.DBInstanceAccount")
            .matching("AccountName", 1),
    )
    .with_field(
        FieldSpec::required("db_instance_id", FieldKind::String)
            .param("DBInstanceId")
            .read_from(ReadFrom::IdPart(0))
            .force_new(),
    )
    .with_field(
        FieldSpec::required("account_name", FieldKind::String)
            .param("AccountName")
            .read_from(ReadFrom::IdPart(1))
            .force_new()
            .check(Check::Pattern(
                r"^[a-z][a-z0-9_]{1,14}[a-z0-9]$",
                "must be 2 to 16 characters of lower-case letters, digits and underscores",
            )),
    )
    .with_field(
        FieldSpec::required("account_password", FieldKind::String)
            .param("AccountPassword")
            .sensitive()
            .check(Check::LenBetween(8, 32)),
    )
    .with_field(
        FieldSpec::optional("account_description", FieldKind::String)
            .remote("AccountDescription")
            .force_new()
            .check(Check::Pattern(
                r"^[A-Za-z][\w_]{2,255}$",
                "must be 2 to 256 characters of letters, digits and underscores",
            )),
    )
    .with_field(
        FieldSpec::computed("status", FieldKind::String)
            .read_from(ReadFrom::Remote("AccountStatus"))
            .translate(&[("Creating", "0"), ("Active", "1"), ("Deleting", "3")]),
    )
    .with_create(CreateSpec::new("CreateAccount"))
    .with_update(UpdateSpec::new("ResetAccountPassword").field("account_password"))
    .with_ready("status", "1", Duration::from_secs(5))
    .with_timeouts(Timeouts::default().with_create(Duration::from_secs(5 * 60)))
}
