use std::time::Duration;

use crate::api::Product;
use crate::backoff::Backoff;
use crate::config::Timeouts;
use crate::schema::{
    Check, CreateSpec, DeleteSpec, FieldKind, FieldSpec, Identity, ReadSpec, ResourceSpec, Rule,
    TagSpec, UpdateSpec,
};

const ALIKAFKA: Product = Product::new("alikafka", "2019-09-16");

/// Message-queue topic, identified by `instance_id:topic`.
///
/// The partition count can only grow; growth is sent as the difference.
/// Tags go through the shared tag actions and are not read back.
pub fn alikafka_topic() -> ResourceSpec {
    ResourceSpec::new(
        "alibabacloudstack_alikafka_topic",
        ALIKAFKA,
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
            .force_new()
            .check(Check::LenBetween(1, 64)),
    )
    .with_field(
        FieldSpec::optional("local_topic", FieldKind::Bool)
            .remote("LocalTopic")
            .force_new()
            .default(false),
    )
    .with_field(
        FieldSpec::optional("compact_topic", FieldKind::Bool)
            .remote("CompactTopic")
            .force_new()
            .default(false),
    )
    .with_field(
        FieldSpec::optional("partition_num", FieldKind::Int)
            .remote("PartitionNum")
            .default(12)
            .check(Check::IntBetween(0, 360)),
    )
    .with_field(
        FieldSpec::required("remark", FieldKind::String)
            .remote("Remark")
            .check(Check::LenBetween(1, 64)),
    )
    .with_field(FieldSpec::optional("tags", FieldKind::Tags))
    .with_rule(Rule::NonDecreasing("partition_num"))
    .with_create(CreateSpec::new("CreateTopic"))
    .with_update(UpdateSpec::new("ModifyTopicRemark").field("remark"))
    .with_update(UpdateSpec::new("ModifyPartitionNum").delta("partition_num", "AddPartitionNum"))
    .with_delete(DeleteSpec::new("DeleteTopic").wait_for_absence())
    .with_tagging(TagSpec::new("tags", "TOPIC", 1).id_param("InstanceId", 0))
    .with_retryable(&["Throttling.User", "ONS_SYSTEM_FLOW_CONTROL"])
    .with_backoff(Backoff::fixed(Duration::from_secs(10)))
    .with_timeouts(Timeouts::default().with_create(Duration::from_secs(10 * 60)))
}
