use crate::api::Product;
use crate::schema::{
    CreateSpec, DeleteSpec, FieldKind, FieldSpec, Identity, ReadFrom, ReadSpec, ResourceSpec,
    UpdateSpec,
};

const OOS: Product = Product::new("Oos", "2019-06-01");

/// Operation-orchestration template, identified by its name.
pub fn oos_template() -> ResourceSpec {
    ResourceSpec::new(
        "alibabacloudstack_oos_template",
        OOS,
        Identity::Response("Template.TemplateName"),
        &["TemplateName"],
        ReadSpec::new("GetTemplate", &["TemplateName"])
            .object("Template")
            .not_found(&["EntityNotExists.Template"]),
    )
    .with_field(
        FieldSpec::required("template_name", FieldKind::String)
            .param("TemplateName")
            .read_from(ReadFrom::IdPart(0))
            .force_new(),
    )
    .with_field(
        FieldSpec::required("content", FieldKind::Json)
            .param("Content")
            .read_from(ReadFrom::Root("Content")),
    )
    .with_field(
        FieldSpec::optional("version_name", FieldKind::String)
            .param("VersionName")
            .read_from(ReadFrom::Declared),
    )
    .with_field(FieldSpec::optional("tags", FieldKind::Tags).remote("Tags"))
    .with_field(
        FieldSpec::optional("auto_delete_executions", FieldKind::Bool)
            .param("AutoDeleteExecutions")
            .read_from(ReadFrom::Declared)
            .default(false),
    )
    .with_field(computed("created_by", "CreatedBy"))
    .with_field(computed("created_date", "CreatedDate"))
    .with_field(computed("description", "Description"))
    .with_field(
        FieldSpec::computed("has_trigger", FieldKind::Bool)
            .read_from(ReadFrom::Remote("HasTrigger")),
    )
    .with_field(computed("share_type", "ShareType"))
    .with_field(computed("template_format", "TemplateFormat"))
    .with_field(computed("template_id", "TemplateId"))
    .with_field(computed("template_type", "TemplateType"))
    .with_field(computed("template_version", "TemplateVersion"))
    .with_field(computed("updated_by", "UpdatedBy"))
    .with_field(computed("updated_date", "UpdatedDate"))
    .with_create(CreateSpec::new("CreateTemplate"))
    .with_update(
        UpdateSpec::new("UpdateTemplate")
            .field("content")
            .field("tags")
            .field("version_name")
            .carry("content"),
    )
    .with_delete(
        DeleteSpec::new("DeleteTemplate")
            .field("auto_delete_executions")
            .absent(&["EntityNotExists.Template"]),
    )
}

fn computed(name: &'static str, remote: &'static str) -> FieldSpec {
    FieldSpec::computed(name, FieldKind::String).read_from(ReadFrom::Remote(remote))
}
