//! Mock routing CLI for integration testing
//!
//! Implements the subset of the `stackit` command surface the harness
//! drives: networks, routing tables and their routes. State persists in the
//! JSON file named by `MOCK_STACKIT_STATE` so consecutive invocations see
//! each other's resources. `MOCK_STACKIT_FAIL_ON` makes every command
//! starting with the given words (e.g. `network create`) exit with code 1.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const STATE_ENV: &str = "MOCK_STACKIT_STATE";
const FAIL_ENV: &str = "MOCK_STACKIT_FAIL_ON";

type Labels = BTreeMap<String, String>;

#[derive(Parser)]
#[command(name = "mock-stackit", about = "Stand-in for the routing commands of the stackit CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output-format", global = true, value_enum, default_value = "default")]
    output: OutputFormat,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long = "assume-yes", global = true)]
    assume_yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Default,
    Pretty,
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Command {
    /// CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Networks of the active project
    Network {
        #[command(subcommand)]
        command: NetworkCommand,
    },

    /// Routing tables of a network area
    #[command(name = "routing-table")]
    RoutingTable {
        #[command(subcommand)]
        command: RoutingTableCommand,
    },
}

impl Command {
    /// Whether the real CLI would prompt before running this
    fn needs_confirmation(&self) -> bool {
        match self {
            Self::Config { .. } => false,
            Self::Network { command } => !matches!(
                command,
                NetworkCommand::List | NetworkCommand::Describe { .. }
            ),
            Self::RoutingTable {
                command: RoutingTableCommand::Route { command },
            } => !matches!(
                command,
                RouteCommand::List { .. } | RouteCommand::Describe { .. }
            ),
            Self::RoutingTable { command } => !matches!(
                command,
                RoutingTableCommand::List { .. } | RoutingTableCommand::Describe { .. }
            ),
        }
    }
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Store configuration values
    Set {
        #[arg(long)]
        project_id: String,
    },
}

/// Flags every routing-table command needs
#[derive(Args)]
struct AreaScope {
    #[arg(long)]
    network_area_id: String,

    #[arg(long)]
    organization_id: String,
}

impl AreaScope {
    fn contains(&self, table: &RoutingTable) -> bool {
        table.network_area_id == self.network_area_id
            && table.organization_id == self.organization_id
    }
}

#[derive(Subcommand)]
enum NetworkCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        routing_table_id: Option<String>,
    },
    List,
    Describe {
        id: String,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        routing_table_id: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum RoutingTableCommand {
    Create {
        #[command(flatten)]
        scope: AreaScope,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_labels)]
        labels: Option<Labels>,
        #[arg(long)]
        non_dynamic_routes: bool,
        #[arg(long)]
        non_system_routes: bool,
    },
    List {
        #[command(flatten)]
        scope: AreaScope,
    },
    Describe {
        id: String,
        #[command(flatten)]
        scope: AreaScope,
    },
    Update {
        id: String,
        #[command(flatten)]
        scope: AreaScope,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_labels)]
        labels: Option<Labels>,
        #[arg(long)]
        non_dynamic_routes: bool,
    },
    Delete {
        id: String,
        #[command(flatten)]
        scope: AreaScope,
    },

    /// Routes of a routing table
    Route {
        #[command(subcommand)]
        command: RouteCommand,
    },
}

/// Flags every route command needs
#[derive(Args)]
struct RouteScope {
    #[arg(long)]
    routing_table_id: String,

    #[command(flatten)]
    area: AreaScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DestinationType {
    Cidrv4,
    Cidrv6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NexthopType {
    Ipv4,
    Ipv6,
    Internet,
    Blackhole,
}

impl NexthopType {
    fn takes_value(self) -> bool {
        matches!(self, Self::Ipv4 | Self::Ipv6)
    }
}

#[derive(Subcommand)]
enum RouteCommand {
    Create {
        #[command(flatten)]
        scope: RouteScope,
        #[arg(long, value_enum)]
        destination_type: DestinationType,
        #[arg(long)]
        destination_value: String,
        #[arg(long, value_enum)]
        nexthop_type: NexthopType,
        #[arg(long)]
        nexthop_value: Option<String>,
        #[arg(long, value_parser = parse_labels)]
        labels: Option<Labels>,
    },
    List {
        #[command(flatten)]
        scope: RouteScope,
    },
    Describe {
        id: String,
        #[command(flatten)]
        scope: RouteScope,
    },
    Update {
        id: String,
        #[command(flatten)]
        scope: RouteScope,
        #[arg(long, value_parser = parse_labels)]
        labels: Option<Labels>,
    },
    Delete {
        id: String,
        #[command(flatten)]
        scope: RouteScope,
    },
}

/// Parse `key=value,key=value`
fn parse_labels(raw: &str) -> Result<Labels, String> {
    raw.split(',')
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("label \"{pair}\" is not key=value"))
        })
        .collect()
}

/// Name a value-enum variant the way it is spelled on the command line
fn value_name(value: impl ValueEnum) -> String {
    value
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_default()
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                print!("{output}");
            }
        }
        Err(message) => {
            eprintln!("Error: {message}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<String, String> {
    if let Ok(fail_on) = std::env::var(FAIL_ENV) {
        if !fail_on.is_empty() && command_words().starts_with(&fail_on) {
            return Err(format!("injected failure for '{fail_on}'"));
        }
    }

    // stdin is not a terminal, so an unconfirmed prompt aborts
    if cli.command.needs_confirmation() && !cli.assume_yes {
        return Err("operation aborted, pass -y to confirm".to_string());
    }

    let path = std::env::var(STATE_ENV)
        .map(PathBuf::from)
        .map_err(|_| format!("{STATE_ENV} is not set"))?;
    let mut state = MockState::load(&path)?;

    let output = state.dispatch(&cli.command, cli.output)?;
    state.save(&path)?;
    Ok(output)
}

/// Leading command words of the invocation, e.g. `network create`
fn command_words() -> String {
    std::env::args()
        .skip(1)
        .take_while(|arg| !arg.starts_with('-'))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingTable {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    labels: Labels,
    dynamic_routes: bool,
    system_routes: bool,
    network_area_id: String,
    organization_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Network {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    routing_table_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Endpoint {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Route {
    id: String,
    routing_table_id: String,
    destination: Endpoint,
    nexthop: Endpoint,
    #[serde(default)]
    labels: Labels,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MockState {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    routing_tables: Vec<RoutingTable>,
    #[serde(default)]
    networks: Vec<Network>,
    #[serde(default)]
    routes: Vec<Route>,
}

impl MockState {
    fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).map_err(|e| format!("corrupt mock state: {e}"))
    }

    fn save(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| format!("cannot write {}: {e}", path.display()))
    }

    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn dispatch(&mut self, command: &Command, output: OutputFormat) -> Result<String, String> {
        match command {
            Command::Config {
                command: ConfigCommand::Set { project_id },
            } => {
                self.project_id = Some(project_id.clone());
                Ok(String::new())
            }
            Command::RoutingTable { command } => self.routing_table_command(command, output),
            Command::Network { command } => self.network_command(command, output),
        }
    }

    fn routing_table_command(
        &mut self,
        command: &RoutingTableCommand,
        output: OutputFormat,
    ) -> Result<String, String> {
        match command {
            RoutingTableCommand::Create {
                scope,
                name,
                description,
                labels,
                non_dynamic_routes,
                non_system_routes,
            } => {
                let table = RoutingTable {
                    id: self.new_id("rt"),
                    name: name.clone(),
                    description: description.clone(),
                    labels: labels.clone().unwrap_or_default(),
                    dynamic_routes: !non_dynamic_routes,
                    system_routes: !non_system_routes,
                    network_area_id: scope.network_area_id.clone(),
                    organization_id: scope.organization_id.clone(),
                };
                let out = render(output, &table, table_line);
                self.routing_tables.push(table);
                out
            }
            RoutingTableCommand::List { scope } => {
                let tables: Vec<&RoutingTable> = self
                    .routing_tables
                    .iter()
                    .filter(|t| scope.contains(t))
                    .collect();
                render(output, &tables, |ts| {
                    ts.iter().map(|t| table_line(t)).collect::<String>()
                })
            }
            RoutingTableCommand::Describe { id, scope } => {
                let table = self.routing_table(id, scope)?;
                render(output, table, table_line)
            }
            RoutingTableCommand::Update {
                id,
                scope,
                name,
                description,
                labels,
                non_dynamic_routes,
            } => {
                self.routing_table(id, scope)?;
                let table = self
                    .routing_tables
                    .iter_mut()
                    .find(|t| &t.id == id)
                    .ok_or_else(|| format!("routing-table {id} not found"))?;
                if let Some(name) = name {
                    table.name = name.clone();
                }
                if let Some(description) = description {
                    table.description = Some(description.clone());
                }
                if let Some(labels) = labels {
                    table.labels = labels.clone();
                }
                table.dynamic_routes = !non_dynamic_routes;
                Ok(String::new())
            }
            RoutingTableCommand::Delete { id, scope } => {
                self.routing_table(id, scope)?;
                self.routing_tables.retain(|t| &t.id != id);
                self.routes.retain(|r| &r.routing_table_id != id);
                Ok(String::new())
            }
            RoutingTableCommand::Route { command } => self.route_command(command, output),
        }
    }

    fn route_command(&mut self, command: &RouteCommand, output: OutputFormat) -> Result<String, String> {
        match command {
            RouteCommand::Create {
                scope,
                destination_type,
                destination_value,
                nexthop_type,
                nexthop_value,
                labels,
            } => {
                self.routing_table(&scope.routing_table_id, &scope.area)?;

                let value = match (nexthop_type.takes_value(), nexthop_value) {
                    (true, Some(value)) => Some(value.clone()),
                    (true, None) => {
                        return Err("required flag(s) \"nexthop-value\" not set".to_string())
                    }
                    (false, _) => None,
                };

                let route = Route {
                    id: self.new_id("route"),
                    routing_table_id: scope.routing_table_id.clone(),
                    destination: Endpoint {
                        kind: value_name(*destination_type),
                        value: Some(destination_value.clone()),
                    },
                    nexthop: Endpoint {
                        kind: value_name(*nexthop_type),
                        value,
                    },
                    labels: labels.clone().unwrap_or_default(),
                };
                // Creation answers with the list of created routes
                let created = vec![route.clone()];
                self.routes.push(route);
                render(output, &created, |rs| {
                    rs.iter().map(route_line).collect::<String>()
                })
            }
            RouteCommand::List { scope } => {
                self.routing_table(&scope.routing_table_id, &scope.area)?;
                let routes: Vec<&Route> = self
                    .routes
                    .iter()
                    .filter(|r| r.routing_table_id == scope.routing_table_id)
                    .collect();
                render(output, &routes, |rs| {
                    rs.iter().map(|r| route_line(r)).collect::<String>()
                })
            }
            RouteCommand::Describe { id, scope } => {
                let route = self.route(id, scope)?;
                render(output, route, route_line)
            }
            RouteCommand::Update { id, scope, labels } => {
                self.route(id, scope)?;
                let route = self
                    .routes
                    .iter_mut()
                    .find(|r| &r.id == id)
                    .ok_or_else(|| format!("route {id} not found"))?;
                if let Some(labels) = labels {
                    route.labels = labels.clone();
                }
                Ok(String::new())
            }
            RouteCommand::Delete { id, scope } => {
                self.route(id, scope)?;
                self.routes.retain(|r| &r.id != id);
                Ok(String::new())
            }
        }
    }

    fn network_command(&mut self, command: &NetworkCommand, output: OutputFormat) -> Result<String, String> {
        match command {
            NetworkCommand::Create {
                name,
                routing_table_id,
            } => {
                if let Some(id) = routing_table_id {
                    self.table_exists(id)?;
                }
                let network = Network {
                    id: self.new_id("net"),
                    name: name.clone(),
                    routing_table_id: routing_table_id.clone(),
                };
                let out = render(output, &network, network_line);
                self.networks.push(network);
                out
            }
            NetworkCommand::List => render(output, &self.networks, |ns| {
                ns.iter().map(network_line).collect::<String>()
            }),
            NetworkCommand::Describe { id } => {
                let network = self.network(id)?;
                render(output, network, network_line)
            }
            NetworkCommand::Update {
                id,
                name,
                routing_table_id,
            } => {
                if let Some(rt) = routing_table_id {
                    self.table_exists(rt)?;
                }
                let network = self
                    .networks
                    .iter_mut()
                    .find(|n| &n.id == id)
                    .ok_or_else(|| format!("network {id} not found"))?;
                if let Some(rt) = routing_table_id {
                    network.routing_table_id = Some(rt.clone());
                }
                if let Some(name) = name {
                    network.name = name.clone();
                }
                Ok(String::new())
            }
            NetworkCommand::Delete { id } => {
                self.network(id)?;
                self.networks.retain(|n| &n.id != id);
                Ok(String::new())
            }
        }
    }

    fn table_exists(&self, id: &str) -> Result<(), String> {
        self.routing_tables
            .iter()
            .any(|t| t.id == id)
            .then_some(())
            .ok_or_else(|| format!("routing-table {id} not found"))
    }

    /// A table is only visible inside its own area and organization
    fn routing_table(&self, id: &str, scope: &AreaScope) -> Result<&RoutingTable, String> {
        self.routing_tables
            .iter()
            .find(|t| t.id == id && scope.contains(t))
            .ok_or_else(|| format!("routing-table {id} not found"))
    }

    fn route(&self, id: &str, scope: &RouteScope) -> Result<&Route, String> {
        self.routing_table(&scope.routing_table_id, &scope.area)?;
        self.routes
            .iter()
            .find(|r| r.id == id && r.routing_table_id == scope.routing_table_id)
            .ok_or_else(|| format!("route {id} not found"))
    }

    fn network(&self, id: &str) -> Result<&Network, String> {
        self.networks
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| format!("network {id} not found"))
    }
}

/// Structured output for `-o yaml` / `-o json`, plain table lines otherwise
fn render<T: Serialize + ?Sized>(
    output: OutputFormat,
    value: &T,
    pretty: impl Fn(&T) -> String,
) -> Result<String, String> {
    match output {
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|json| json + "\n")
            .map_err(|e| e.to_string()),
        OutputFormat::Default | OutputFormat::Pretty => Ok(pretty(value)),
    }
}

fn table_line(table: &RoutingTable) -> String {
    format!(
        "{}\t{}\tdynamic_routes={}\n",
        table.id, table.name, table.dynamic_routes
    )
}

fn network_line(network: &Network) -> String {
    format!(
        "{}\t{}\trouting_table={}\n",
        network.id,
        network.name,
        network.routing_table_id.as_deref().unwrap_or("-")
    )
}

fn route_line(route: &Route) -> String {
    format!(
        "{}\t{} {}\t-> {} {}\n",
        route.id,
        route.destination.kind,
        route.destination.value.as_deref().unwrap_or(""),
        route.nexthop.kind,
        route.nexthop.value.as_deref().unwrap_or("")
    )
}
