use crate::api::Product;
use crate::schema::{
    Check, CreateSpec, DeleteSpec, FieldKind, FieldSpec, Identity, ReadFrom, ReadSpec,
    ResourceSpec, UpdateSpec,
};

const VPC: Product = Product::new("Vpc", "2016-04-28");

/// Public bandwidth attached to an IPv6 address.
///
/// Allocation and modification carry a fresh `ClientToken` per attempt.
pub fn vpc_ipv6_internet_bandwidth() -> ResourceSpec {
    ResourceSpec::new(
        "alibabacloudstack_vpc_ipv6_internet_bandwidth",
        VPC,
        Identity::Response("InternetBandwidthId"),
        &["Ipv6InternetBandwidthId"],
        ReadSpec::new("DescribeIpv6Addresses", &["Ipv6InternetBandwidthId"])
            .object("Ipv6Addresses.Ipv6Address"),
    )
    .with_field(
        FieldSpec::required("bandwidth", FieldKind::Int)
            .param("Bandwidth")
            .read_from(ReadFrom::Remote("Ipv6InternetBandwidth.Bandwidth"))
            .check(Check::IntBetween(1, 5000)),
    )
    .with_field(
        FieldSpec::optional_computed("internet_charge_type", FieldKind::String)
            .param("InternetChargeType")
            .read_from(ReadFrom::Remote("Ipv6InternetBandwidth.InternetChargeType"))
            .force_new()
            .check(Check::OneOf(&["PayByBandwidth", "PayByTraffic"])),
    )
    .with_field(
        FieldSpec::required("ipv6_address_id", FieldKind::String)
            .remote("Ipv6AddressId")
            .force_new(),
    )
    .with_field(
        FieldSpec::required("ipv6_gateway_id", FieldKind::String)
            .remote("Ipv6GatewayId")
            .force_new(),
    )
    .with_field(
        FieldSpec::computed("status", FieldKind::String)
            .read_from(ReadFrom::Remote("Ipv6InternetBandwidth.BusinessStatus")),
    )
    .with_create(CreateSpec::new("AllocateIpv6InternetBandwidth").with_client_token())
    .with_update(
        UpdateSpec::new("ModifyIpv6InternetBandwidth")
            .field("bandwidth")
            .with_client_token(),
    )
    .with_delete(DeleteSpec::new("DeleteIpv6InternetBandwidth").field("ipv6_address_id"))
}
