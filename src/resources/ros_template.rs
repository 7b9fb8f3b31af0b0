use crate::api::Product;
use crate::schema::{
    CreateSpec, DeleteSpec, FieldKind, FieldSpec, Identity, ReadFrom, ReadSpec, ResourceSpec,
    UpdateSpec,
};

const ROS: Product = Product::new("ROS", "2019-09-10");

/// Resource-orchestration template, identified by the remote `TemplateId`.
pub fn ros_template() -> ResourceSpec {
    ResourceSpec::new(
        "alibabacloudstack_ros_template",
        ROS,
        Identity::Response("TemplateId"),
        &["TemplateId"],
        ReadSpec::new("GetTemplate", &["TemplateId"]).not_found(&["TemplateNotFound"]),
    )
    .with_field(FieldSpec::required("template_name", FieldKind::String).remote("TemplateName"))
    .with_field(FieldSpec::optional("description", FieldKind::String).remote("Description"))
    .with_field(FieldSpec::optional("template_body", FieldKind::Json).remote("TemplateBody"))
    .with_field(
        FieldSpec::optional("template_url", FieldKind::String)
            .param("TemplateURL")
            .read_from(ReadFrom::Declared),
    )
    .with_create(CreateSpec::new("CreateTemplate"))
    .with_update(
        UpdateSpec::new("UpdateTemplate")
            .field("description")
            .field("template_body")
            .field("template_name")
            .field("template_url"),
    )
    .with_delete(DeleteSpec::new("DeleteTemplate").absent(&[
        "ChangeSetNotFound",
        "StackNotFound",
        "TemplateNotFound",
    ]))
}
