//! Registry of data sources.

use crate::api::Product;
use crate::datasource::{ListSpec, Lookup, LookupValue};
use crate::error::ReconcileError;

const ECS: Product = Product::new("Ecs", "2014-05-26");

const DATA_SOURCES: &[(&str, fn() -> ListSpec)] = &[("alibabacloudstack_instances", ecs_instances)];

pub fn get_data_source(name: &str) -> Result<ListSpec, ReconcileError> {
    DATA_SOURCES
        .iter()
        .find(|(type_name, _)| *type_name == name)
        .map(|(_, build)| build())
        .ok_or_else(|| ReconcileError::UnknownResource(name.to_string()))
}

pub fn data_source_types() -> impl Iterator<Item = &'static str> {
    DATA_SOURCES.iter().map(|(type_name, _)| *type_name)
}

/// Compute instances. Zone, VPC, vSwitch and status filters are also passed
/// to the service; image and role filters are applied locally.
///
/// Role names and disk mappings come from their own paged actions, matched
/// to instances by id.
pub fn ecs_instances() -> ListSpec {
    ListSpec::new(
        "alibabacloudstack_instances",
        ECS,
        "DescribeInstances",
        "Instances.Instance",
    )
    .page_size(50)
    .identified_by("InstanceId", "InstanceName")
    .ids_param("InstanceIds")
    .server_filter("availability_zone", "ZoneId")
    .server_filter("vpc_id", "VpcId")
    .server_filter("vswitch_id", "VSwitchId")
    .server_filter("status", "Status")
    .attribute("id", "InstanceId")
    .attribute("region_id", "RegionId")
    .attribute("availability_zone", "ZoneId")
    .attribute("status", "Status")
    .attribute("name", "InstanceName")
    .attribute("instance_type", "InstanceType")
    .attribute("vpc_id", "VpcAttributes.VpcId")
    .attribute("vswitch_id", "VpcAttributes.VSwitchId")
    .attribute("image_id", "ImageId")
    .attribute("private_ip", "VpcAttributes.PrivateIpAddress.IpAddress.0")
    .attribute("public_ip", "PublicIpAddress.IpAddress.0")
    .attribute("eip", "EipAddress.IpAddress")
    .attribute("description", "Description")
    .attribute("security_groups", "SecurityGroupIds.SecurityGroupId")
    .attribute("key_name", "KeyPairName")
    .attribute("creation_time", "CreationTime")
    .attribute("instance_charge_type", "InstanceChargeType")
    .attribute("internet_charge_type", "InternetChargeType")
    .attribute("internet_max_bandwidth_out", "InternetMaxBandwidthOut")
    .tags("Tags.Tag")
    .with_lookup(
        Lookup::new(
            "ram_role_name",
            "DescribeInstanceRamRole",
            "InstanceRamRoleSets.InstanceRamRoleSet",
            "InstanceId",
            LookupValue::Scalar("RamRoleName"),
        )
        .scoped_by("InstanceIds", 100),
    )
    .with_lookup(
        Lookup::new(
            "disk_device_mappings",
            "DescribeDisks",
            "Disks.Disk",
            "InstanceId",
            LookupValue::Objects(vec![
                ("device", "Device"),
                ("size", "Size"),
                ("category", "Category"),
                ("type", "Type"),
            ]),
        )
        .page_size(100),
    )
}
