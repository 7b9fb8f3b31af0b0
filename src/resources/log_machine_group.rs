use std::time::Duration;

use crate::api::Product;
use crate::backoff::Backoff;
use crate::config::Timeouts;
use crate::schema::{
    Check, CreateSpec, DeleteSpec, FieldKind, FieldSpec, Identity, ReadFrom, ReadSpec,
    ResourceSpec, UpdateSpec,
};

const SLS: Product = Product::new("SLS", "2020-03-31");

const ABSENT: &[&str] = &["ProjectNotExist", "MachineGroupNotExist"];

/// Log-service machine group, identified by `project:name`.
pub fn log_machine_group() -> ResourceSpec {
    ResourceSpec::new(
        "alibabacloudstack_log_machine_group",
        SLS,
        Identity::Fields(&["project", "name"]),
        &["ProjectName", "GroupName"],
        ReadSpec::new("GetMachineGroup", &["ProjectName", "GroupName"])
            .object("MachineGroup")
            .not_found(ABSENT),
    )
    .with_field(
        FieldSpec::required("project", FieldKind::String)
            .param("ProjectName")
            .read_from(ReadFrom::IdPart(0))
            .force_new(),
    )
    .with_field(
        FieldSpec::required("name", FieldKind::String)
            .remote("GroupName")
            .force_new(),
    )
    .with_field(
        FieldSpec::optional("identify_type", FieldKind::String)
            .remote("MachineIdentifyType")
            .default("ip")
            .check(Check::OneOf(&["ip", "userdefined"])),
    )
    .with_field(
        FieldSpec::optional("topic", FieldKind::String)
            .param("GroupTopic")
            .read_from(ReadFrom::Remote("GroupAttribute.GroupTopic")),
    )
    .with_field(FieldSpec::required("identify_list", FieldKind::StringSet).remote("MachineList"))
    .with_create(CreateSpec::new("CreateMachineGroup"))
    .with_update(
        UpdateSpec::new("UpdateMachineGroup")
            .field("identify_type")
            .field("identify_list")
            .field("topic")
            .carry("identify_type")
            .carry("identify_list"),
    )
    .with_delete(
        DeleteSpec::new("DeleteMachineGroup")
            .absent(ABSENT)
            .wait_for_absence(),
    )
    .with_retryable(&["RequestTimeout"])
    .with_backoff(Backoff::fixed(Duration::from_secs(5)))
    .with_timeouts(
        Timeouts::default()
            .with_create(Duration::from_secs(2 * 60))
            .with_update(Duration::from_secs(2 * 60))
            .with_delete(Duration::from_secs(3 * 60)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::Reconciler;
    use crate::resource::{ResourceId, ResourceState};
    use crate::testing::ScriptedInvoker;
    use serde_json::json;

    fn group() -> serde_json::Value {
        json!({"MachineGroup": {
            "GroupName": "web",
            "MachineIdentifyType": "ip",
            "MachineList": ["10.0.0.2", "10.0.0.1"],
            "GroupAttribute": {"GroupTopic": "nginx"}
        }})
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_maps_nested_topic_and_project_from_id() {
        let spec = log_machine_group();
        let invoker = ScriptedInvoker::new();
        invoker.always("GetMachineGroup", group());

        let state = Reconciler::new(&invoker, &spec)
            .read(&ResourceId::new("logs:web"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.get("project"), Some(&json!("logs")));
        assert_eq!(state.get("topic"), Some(&json!("nginx")));
        assert_eq!(state.get("identify_list"), Some(&json!(["10.0.0.2", "10.0.0.1"])));

        let get = &invoker.calls_to("GetMachineGroup")[0];
        assert_eq!(get.params["ProjectName"], "logs");
        assert_eq!(get.params["GroupName"], "web");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_polls_until_group_is_gone() {
        let spec = log_machine_group();
        let invoker = ScriptedInvoker::new();
        invoker
            .fail("DeleteMachineGroup", 500, "RequestTimeout")
            .reply("DeleteMachineGroup", json!({}))
            .reply("GetMachineGroup", group())
            .always_fail("GetMachineGroup", 404, "MachineGroupNotExist");
        let state = ResourceState::new(spec.type_name, ResourceId::new("logs:web"), Default::default());

        Reconciler::new(&invoker, &spec).delete(&state).await.unwrap();
        assert_eq!(invoker.call_count("DeleteMachineGroup"), 2);
        assert_eq!(invoker.call_count("GetMachineGroup"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reordered_machine_list_is_not_a_change() {
        let spec = log_machine_group();
        let invoker = ScriptedInvoker::new();
        let prior = ResourceState::new(
            spec.type_name,
            ResourceId::new("logs:web"),
            json!({
                "project": "logs",
                "name": "web",
                "identify_type": "ip",
                "identify_list": ["10.0.0.2", "10.0.0.1"]
            })
            .as_object()
            .unwrap()
            .clone(),
        );
        let declared = crate::resource::DeclaredResource::new()
            .with("project", "logs")
            .with("name", "web")
            .with("identify_list", json!(["10.0.0.1", "10.0.0.2"]));

        Reconciler::new(&invoker, &spec)
            .update(&prior, &declared)
            .await
            .unwrap();
        assert_eq!(invoker.total_calls(), 0);
    }
}
