use crate::api::Product;
use crate::schema::{
    CreateSpec, DeleteSpec, FieldKind, FieldSpec, Identity, ReadFrom, ReadSpec, ResourceSpec,
    Rule, UpdateSpec,
};

const ARMS: Product = Product::new("ARMS", "2019-08-08");

/// Alert contact. At least one delivery channel must be configured.
pub fn arms_alert_contact() -> ResourceSpec {
    ResourceSpec::new(
        "alibabacloudstack_arms_alert_contact",
        ARMS,
        Identity::Response("ContactId"),
        &["ContactId"],
        ReadSpec::new("SearchAlertContact", &["ContactIds"])
            .id_as_list()
            .object("PageBean.Contacts")
            .matching("ContactId", 0),
    )
    .with_field(FieldSpec::optional("alert_contact_name", FieldKind::String).remote("ContactName"))
    .with_field(
        FieldSpec::optional("ding_robot_webhook_url", FieldKind::String)
            .param("DingRobotWebhookUrl")
            .read_from(ReadFrom::Remote("DingRobot")),
    )
    .with_field(FieldSpec::optional("email", FieldKind::String).remote("Email"))
    .with_field(
        FieldSpec::optional("phone_num", FieldKind::String)
            .param("PhoneNum")
            .read_from(ReadFrom::Remote("Phone")),
    )
    .with_field(FieldSpec::optional("system_noc", FieldKind::Bool).remote("SystemNoc"))
    .with_rule(Rule::AtLeastOneOf(&[
        "ding_robot_webhook_url",
        "email",
        "phone_num",
    ]))
    .with_create(CreateSpec::new("CreateAlertContact"))
    .with_update(
        UpdateSpec::new("UpdateAlertContact")
            .field("alert_contact_name")
            .field("ding_robot_webhook_url")
            .field("email")
            .field("phone_num")
            .field("system_noc"),
    )
    .with_delete(DeleteSpec::new("DeleteAlertContact"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::Reconciler;
    use crate::resource::{DeclaredResource, ResourceId, ResourceState};
    use crate::testing::ScriptedInvoker;
    use serde_json::json;

    fn contacts(email: &str) -> serde_json::Value {
        json!({"PageBean": {"Contacts": [
            {"ContactId": 7, "ContactName": "ops", "Email": "other@example.com"},
            {"ContactId": 42, "ContactName": "ops", "Email": email, "Phone": "", "DingRobot": "", "SystemNoc": false}
        ]}})
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_takes_id_from_response() {
        let spec = arms_alert_contact();
        let invoker = ScriptedInvoker::new();
        invoker
            .reply("CreateAlertContact", json!({"ContactId": 42}))
            .always("SearchAlertContact", contacts("ops@example.com"));

        let declared = DeclaredResource::new()
            .with("alert_contact_name", "ops")
            .with("email", "ops@example.com");
        let state = Reconciler::new(&invoker, &spec)
            .create(&declared)
            .await
            .unwrap();

        assert_eq!(state.id.as_str(), "42");
        assert_eq!(state.get("email"), Some(&json!("ops@example.com")));
        assert_eq!(state.get("phone_num"), None);
        let search = &invoker.calls_to("SearchAlertContact")[0];
        assert_eq!(search.params["ContactIds"], "[\"42\"]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_channel_rejected_before_any_call() {
        let spec = arms_alert_contact();
        let invoker = ScriptedInvoker::new();
        let declared = DeclaredResource::new().with("alert_contact_name", "ops");

        let err = Reconciler::new(&invoker, &spec)
            .create(&declared)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err
            .to_string()
            .contains("one of ding_robot_webhook_url, email, phone_num must be set"));
        assert_eq!(invoker.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_sends_only_changed_channel() {
        let spec = arms_alert_contact();
        let invoker = ScriptedInvoker::new();
        invoker
            .reply("UpdateAlertContact", json!({"IsSuccess": true}))
            .always("SearchAlertContact", contacts("new@example.com"));

        let prior = ResourceState::new(
            spec.type_name,
            ResourceId::new("42"),
            json!({"alert_contact_name": "ops", "email": "ops@example.com", "system_noc": false})
                .as_object()
                .unwrap()
                .clone(),
        );
        let declared = DeclaredResource::new()
            .with("alert_contact_name", "ops")
            .with("email", "new@example.com")
            .with("system_noc", false);
        Reconciler::new(&invoker, &spec)
            .update(&prior, &declared)
            .await
            .unwrap();

        let update = &invoker.calls_to("UpdateAlertContact")[0];
        assert_eq!(update.params["ContactId"], "42");
        assert_eq!(update.params["Email"], "new@example.com");
        assert!(!update.params.contains_key("ContactName"));
    }
}
