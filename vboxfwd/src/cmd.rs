use clap::Args;
use extradata::SharedExtraData;
use portfwd::{Collection, ForwardedPort, Protocol};
use serde::Serialize;
use tracing::info;
use vboxmanage::{VBoxManage, VmExtraData};

use crate::error::{CliError, CliResult};

async fn open_store(vm: &str) -> CliResult<SharedExtraData> {
    let driver = VBoxManage::locate()?;
    let store = VmExtraData::load(driver, vm).await?;
    Ok(extradata::shared(store))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Machine name or UUID
    pub vm: String,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleRow {
    name: String,
    guest_port: Option<u16>,
    host_port: Option<u16>,
    protocol: String,
    device: String,
    instance: u32,
}

impl From<&ForwardedPort> for RuleRow {
    fn from(port: &ForwardedPort) -> Self {
        Self {
            name: port.name().unwrap_or_default().to_string(),
            guest_port: port.guestport(),
            host_port: port.hostport(),
            protocol: port.protocol().to_string(),
            device: port.device().to_string(),
            instance: port.instance(),
        }
    }
}

fn fmt_port(port: Option<u16>) -> String {
    port.map_or_else(|| "-".to_string(), |p| p.to_string())
}

pub async fn run_list(args: ListArgs) -> CliResult<()> {
    let store = open_store(&args.vm).await?;
    let rules = Collection::populate(store).await;
    let rows: Vec<RuleRow> = rules.iter().map(RuleRow::from).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("no forwarding rules on {}", args.vm);
        return Ok(());
    }
    for row in &rows {
        println!(
            "{name:<20} {host:>5} -> {guest:<5}  {proto:<3}  {device}/{instance}",
            name = row.name,
            host = fmt_port(row.host_port),
            guest = fmt_port(row.guest_port),
            proto = row.protocol,
            device = row.device,
            instance = row.instance,
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Machine name or UUID
    pub vm: String,
    /// Rule name (key segment in the extra-data namespace)
    #[arg(long)]
    pub name: String,
    /// Port inside the guest
    #[arg(long)]
    pub guest_port: u16,
    /// Host port to forward from
    #[arg(long)]
    pub host_port: u16,
    /// tcp or udp
    #[arg(long, default_value = "tcp")]
    pub protocol: Protocol,
    /// NAT device the rule hangs off
    #[arg(long, default_value = portfwd::DEFAULT_DEVICE)]
    pub device: String,
    /// Device instance
    #[arg(long, default_value_t = 0)]
    pub instance: u32,
}

pub async fn run_add(args: AddArgs) -> CliResult<()> {
    let store = open_store(&args.vm).await?;

    let mut rule = ForwardedPort::new();
    rule.set_name(&args.name);
    rule.set_guestport(args.guest_port);
    rule.set_hostport(args.host_port);
    rule.set_protocol(args.protocol);
    rule.set_device(&args.device);
    rule.set_instance(args.instance);
    rule.attach(store);
    rule.save_strict().await?;

    info!(vm = %args.vm, name = %args.name, "forwarding rule saved");
    Ok(())
}

// ---------------------------------------------------------------------------
// Remove
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RemoveArgs {
    /// Machine name or UUID
    pub vm: String,
    /// Rule name
    pub name: String,
}

pub async fn run_remove(args: RemoveArgs) -> CliResult<()> {
    let store = open_store(&args.vm).await?;
    let mut rules = Collection::populate(store.clone()).await;
    if !rules.destroy(&args.name).await? {
        return Err(CliError::RuleNotFound(args.name));
    }
    store.lock().await.save().await?;
    info!(vm = %args.vm, name = %args.name, "forwarding rule removed");
    Ok(())
}
