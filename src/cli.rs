mod args;

pub use args::{
    ApplyArgs, Cli, Command, ConnectionArgs, ImportArgs, ListArgs, OutputFormat, PlanArgs,
    StateArgs,
};

use std::path::Path;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr, eyre};

use stackform::api::ApiClient;
use stackform::config::{ClientConfig, Credentials, Timeouts};
use stackform::data_sources::{data_source_types, get_data_source};
use stackform::datasource::{ListQuery, list};
use stackform::reconciler::{self, Reconciler};
use stackform::resource::{DeclaredResource, ResourceId, ResourceState};
use stackform::resources::{get_resource, resource_types};

use crate::output::{self, KindRow};

impl ConnectionArgs {
    pub fn into_config(self) -> Result<ClientConfig> {
        let access_key = self
            .access_key
            .ok_or_else(|| eyre!("--access-key or ALIBABACLOUDSTACK_ACCESS_KEY is required"))?;
        let secret_key = self
            .secret_key
            .ok_or_else(|| eyre!("--secret-key or ALIBABACLOUDSTACK_SECRET_KEY is required"))?;
        let region = self
            .region
            .ok_or_else(|| eyre!("--region or ALIBABACLOUDSTACK_REGION is required"))?;
        let endpoint = self
            .endpoint
            .ok_or_else(|| eyre!("--endpoint or ALIBABACLOUDSTACK_ENDPOINT is required"))?;

        let config = ClientConfig::new(
            endpoint,
            region,
            self.department.unwrap_or_default(),
            Credentials::new(access_key, secret_key),
        )
        .with_insecure(self.insecure);

        Ok(self
            .product_endpoint
            .into_iter()
            .fold(config, |config, (product, url)| {
                config.with_product_endpoint(product, url)
            }))
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let timeouts = cli
        .timeout_secs
        .map(|secs| Timeouts::uniform(Duration::from_secs(secs)));

    match cli.command {
        Command::Resources => {
            let rows = resource_types()
                .into_iter()
                .map(|type_name| KindRow {
                    type_name: type_name.to_string(),
                    kind: "resource",
                })
                .chain(data_source_types().map(|type_name| KindRow {
                    type_name: type_name.to_string(),
                    kind: "data source",
                }))
                .collect();
            println!("{}", output::kinds_table(rows));
        }
        Command::Plan(args) => {
            let spec = get_resource(&args.resource_type)?;
            let declared = read_declared(&args.config)?;
            let prior = args.state.as_deref().map(read_state).transpose()?;
            // planning never calls out, so no credentials are needed
            let plan = reconciler::plan(&spec, prior.as_ref(), &declared)?;
            println!("{}", output::plan_tree(&plan, &spec));
        }
        Command::Create(args) => {
            let spec = get_resource(&args.resource_type)?;
            let declared = read_declared(&args.config)?;
            let client = connect(cli.connection)?;
            let state = connected(&client, &spec, timeouts)
                .create(&declared)
                .await?;
            tracing::info!(resource_type = %state.resource_type, id = %state.id, "created");
            write_state(&args.state, &state)?;
            println!("{}", output::state_tree(&state, &spec));
        }
        Command::Read(args) => {
            let prior = read_state(&args.state)?;
            let spec = get_resource(&prior.resource_type)?;
            let client = connect(cli.connection)?;
            match connected(&client, &spec, timeouts)
                .read(&prior.id, Some(&prior.attributes))
                .await?
            {
                Some(state) => {
                    write_state(&args.state, &state)?;
                    println!("{}", output::state_tree(&state, &spec));
                }
                None => {
                    tracing::warn!(id = %prior.id, "resource no longer exists, removing state");
                    remove_state(&args.state)?;
                }
            }
        }
        Command::Update(args) => {
            let spec = get_resource(&args.resource_type)?;
            let declared = read_declared(&args.config)?;
            let prior = read_state(&args.state)?;
            if prior.resource_type != spec.type_name {
                return Err(eyre!(
                    "state holds a {}, not a {}",
                    prior.resource_type,
                    spec.type_name
                ));
            }
            let client = connect(cli.connection)?;
            let state = connected(&client, &spec, timeouts)
                .update(&prior, &declared)
                .await?;
            tracing::info!(id = %state.id, "updated");
            write_state(&args.state, &state)?;
            println!("{}", output::state_tree(&state, &spec));
        }
        Command::Delete(args) => {
            let prior = read_state(&args.state)?;
            let spec = get_resource(&prior.resource_type)?;
            let client = connect(cli.connection)?;
            connected(&client, &spec, timeouts).delete(&prior).await?;
            tracing::info!(id = %prior.id, "deleted");
            remove_state(&args.state)?;
        }
        Command::Import(args) => {
            let spec = get_resource(&args.resource_type)?;
            let client = connect(cli.connection)?;
            let state = connected(&client, &spec, timeouts)
                .import(&ResourceId::new(args.id))
                .await?;
            write_state(&args.state, &state)?;
            println!("{}", output::state_tree(&state, &spec));
        }
        Command::List(args) => {
            let mut spec = get_data_source(&args.data_source)?;
            if let Some(timeouts) = timeouts {
                spec = spec.with_timeout(timeouts.read);
            }
            let mut query = ListQuery::new().with_ids(args.ids);
            if let Some(pattern) = args.name_regex {
                query = query.with_name_regex(pattern);
            }
            for (attr, value) in args.filter {
                query = query.with_filter(attr, value);
            }
            for (key, value) in args.tag {
                query = query.with_tag(key, value);
            }

            let client = connect(cli.connection)?;
            let result = list(&client, &spec, &query).await?;
            match args.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Table => {
                    let columns: Vec<&str> = spec
                        .attributes
                        .iter()
                        .map(|(name, _)| *name)
                        .filter(|name| matches!(*name, "status" | "instance_type" | "private_ip"))
                        .collect();
                    println!("{}", output::listing_table(&result, &columns));
                }
            }
        }
    }

    Ok(())
}

fn connect(connection: ConnectionArgs) -> Result<ApiClient> {
    let config = connection.into_config()?;
    Ok(ApiClient::new(config)?)
}

fn connected<'a>(
    client: &'a ApiClient,
    spec: &'a stackform::schema::ResourceSpec,
    timeouts: Option<Timeouts>,
) -> Reconciler<'a> {
    let reconciler = Reconciler::new(client, spec);
    match timeouts {
        Some(timeouts) => reconciler.with_timeouts(timeouts),
        None => reconciler,
    }
}

fn read_declared(path: &Path) -> Result<DeclaredResource> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("{} is not valid JSON", path.display()))?;
    Ok(DeclaredResource::from_value(value)?)
}

fn read_state(path: &Path) -> Result<ResourceState> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read state {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("{} is not a state file", path.display()))
}

fn write_state(path: &Path, state: &ResourceState) -> Result<()> {
    let raw = serde_json::to_string_pretty(state)?;
    std::fs::write(path, raw).wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn remove_state(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            Err(e).wrap_err_with(|| format!("failed to remove {}", path.display()))
        }
        _ => Ok(()),
    }
}
