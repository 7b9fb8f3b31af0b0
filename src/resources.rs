mod alikafka_topic;
mod arms_alert_contact;
mod dms_enterprise;
mod gpdb_account;
mod log_machine_group;
mod oos_template;
mod ros_template;
mod vpc_ipv6_internet_bandwidth;

pub use alikafka_topic::alikafka_topic;
pub use arms_alert_contact::arms_alert_contact;
pub use dms_enterprise::{dms_enterprise_instance, dms_enterprise_user};
pub use gpdb_account::gpdb_account;
pub use log_machine_group::log_machine_group;
pub use oos_template::oos_template;
pub use ros_template::ros_template;
pub use vpc_ipv6_internet_bandwidth::vpc_ipv6_internet_bandwidth;

use crate::error::ReconcileError;
use crate::schema::ResourceSpec;

const RESOURCES: &[(&str, fn() -> ResourceSpec)] = &[
    ("alibabacloudstack_alikafka_topic", alikafka_topic),
    ("alibabacloudstack_arms_alert_contact", arms_alert_contact),
    ("alibabacloudstack_dms_enterprise_instance", dms_enterprise_instance),
    ("alibabacloudstack_dms_enterprise_user", dms_enterprise_user),
    ("alibabacloudstack_gpdb_account", gpdb_account),
    ("alibabacloudstack_log_machine_group", log_machine_group),
    ("alibabacloudstack_oos_template", oos_template),
    ("alibabacloudstack_ros_template", ros_template),
    (
        "alibabacloudstack_vpc_ipv6_internet_bandwidth",
        vpc_ipv6_internet_bandwidth,
    ),
];

pub fn get_resource(name: &str) -> Result<ResourceSpec, ReconcileError> {
    RESOURCES
        .iter()
        .find(|(type_name, _)| *type_name == name)
        .map(|(_, build)| build())
        .ok_or_else(|| ReconcileError::UnknownResource(name.to_string()))
}

pub fn resource_types() -> Vec<&'static str> {
    RESOURCES.iter().map(|(type_name, _)| *type_name).collect()
}
