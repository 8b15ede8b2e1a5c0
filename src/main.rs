use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dynbus::config::{self, Config};
use dynbus::introspect::Argument;
use dynbus::value::HostValue;
use dynbus::{connect, list_objects, list_services};

#[derive(Parser)]
#[command(name = "dynbus")]
#[command(author, version, about = "Call D-Bus methods discovered at runtime", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a method on a remote object
    Call {
        /// Service name, or @alias from the config
        dest: String,

        /// Method name (dashes and underscores are interchangeable)
        method: String,

        /// Arguments as JSON literals; bare words are taken as strings
        args: Vec<String>,

        /// Object path (defaults to the alias path)
        #[arg(long)]
        path: Option<String>,

        /// Interface name (defaults to the alias interface)
        #[arg(long)]
        interface: Option<String>,
    },

    /// List the methods of a remote interface
    Methods {
        /// Service name, or @alias from the config
        dest: String,

        #[arg(long)]
        path: Option<String>,

        #[arg(long)]
        interface: Option<String>,
    },

    /// Show one method's arguments and annotations
    Info {
        /// Service name, or @alias from the config
        dest: String,

        /// Method name (dashes and underscores are interchangeable)
        method: String,

        #[arg(long)]
        path: Option<String>,

        #[arg(long)]
        interface: Option<String>,
    },

    /// List every name currently on the session bus
    Services,

    /// List child objects below a path
    Objects {
        /// Service name, or @alias from the config (only the service part
        /// of an alias is used here)
        dest: String,

        /// Path to start from
        #[arg(long, default_value = "/")]
        path: String,
    },

    /// Manage service aliases
    Alias {
        #[command(subcommand)]
        action: AliasAction,
    },
}

#[derive(Subcommand)]
enum AliasAction {
    /// Show the alias table
    List,

    /// Add or replace an alias
    Add {
        name: String,
        service: String,
        path: String,
        interface: String,
    },

    /// Remove an alias
    Remove { name: String },
}

/// A fully resolved service/path/interface triple.
struct Target {
    service: String,
    path: String,
    interface: String,
}

fn resolve_target(
    dest: &str,
    path: Option<String>,
    interface: Option<String>,
) -> anyhow::Result<Target> {
    if let Some(alias_name) = dest.strip_prefix('@') {
        let config = Config::load()?;
        let alias = config.resolve(alias_name)?;
        Ok(Target {
            service: alias.service.clone(),
            path: path.unwrap_or_else(|| alias.path.clone()),
            interface: interface.unwrap_or_else(|| alias.interface.clone()),
        })
    } else {
        let path =
            path.ok_or_else(|| anyhow::anyhow!("--path is required unless an @alias is used"))?;
        let interface = interface
            .ok_or_else(|| anyhow::anyhow!("--interface is required unless an @alias is used"))?;
        Ok(Target {
            service: dest.to_string(),
            path,
            interface,
        })
    }
}

fn resolve_service(dest: &str) -> anyhow::Result<String> {
    if let Some(alias_name) = dest.strip_prefix('@') {
        let config = Config::load()?;
        Ok(config.resolve(alias_name)?.service.clone())
    } else {
        Ok(dest.to_string())
    }
}

fn parse_argument(raw: &str) -> anyhow::Result<HostValue> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => json_to_host(&json),
        // Unquoted words arrive here; treat them as strings.
        Err(_) => Ok(HostValue::Str(raw.to_string())),
    }
}

fn json_to_host(json: &serde_json::Value) -> anyhow::Result<HostValue> {
    use serde_json::Value;
    Ok(match json {
        Value::Null => HostValue::Unit,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                HostValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                HostValue::Float(f)
            } else {
                anyhow::bail!("number {n} is out of range")
            }
        }
        Value::String(s) => HostValue::Str(s.clone()),
        Value::Array(items) => HostValue::List(
            items
                .iter()
                .map(json_to_host)
                .collect::<anyhow::Result<Vec<_>>>()?,
        ),
        Value::Bool(_) => anyhow::bail!("booleans have no wire representation"),
        Value::Object(_) => anyhow::bail!("objects have no wire representation"),
    })
}

fn host_to_json(value: &HostValue) -> serde_json::Value {
    use serde_json::{json, Value};
    match value {
        HostValue::Unit => Value::Null,
        HostValue::Int(i) => json!(i),
        HostValue::Float(f) => json!(f),
        HostValue::Str(s) | HostValue::Symbol(s) => json!(s),
        HostValue::Bytes(bytes) => Value::Array(bytes.iter().map(|b| json!(b)).collect()),
        HostValue::List(items) | HostValue::Vector(items) => {
            Value::Array(items.iter().map(host_to_json).collect())
        }
    }
}

fn print_argument(direction: &str, arg: &Argument) {
    let name = if arg.name.is_empty() { "_" } else { &arg.name };
    println!("  {direction} {:4} {name}", arg.signature);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("dynbus=debug,zbus=info")
    } else {
        EnvFilter::new("dynbus=info,zbus=warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Call {
            dest,
            method,
            args,
            path,
            interface,
        } => {
            let target = resolve_target(&dest, path, interface)?;
            let parsed: Vec<HostValue> = args
                .iter()
                .map(|raw| parse_argument(raw))
                .collect::<anyhow::Result<_>>()?;
            let handle = connect(&target.service, &target.path, &target.interface)?;
            match handle.call(&method, &parsed)? {
                HostValue::Unit => {}
                result => println!("{}", serde_json::to_string_pretty(&host_to_json(&result))?),
            }
        }

        Commands::Methods {
            dest,
            path,
            interface,
        } => {
            let target = resolve_target(&dest, path, interface)?;
            let handle = connect(&target.service, &target.path, &target.interface)?;
            for name in handle.methods()? {
                println!("{name}");
            }
        }

        Commands::Info {
            dest,
            method,
            path,
            interface,
        } => {
            let target = resolve_target(&dest, path, interface)?;
            let handle = connect(&target.service, &target.path, &target.interface)?;
            let info = handle.method_info(&method)?;
            println!("{}", info.name);
            for arg in &info.inputs {
                print_argument("in ", arg);
            }
            for arg in &info.outputs {
                print_argument("out", arg);
            }
            for note in &info.annotations {
                println!("  # {note}");
            }
        }

        Commands::Services => {
            for name in list_services()? {
                println!("{name}");
            }
        }

        Commands::Objects { dest, path } => {
            let service = resolve_service(&dest)?;
            for object in list_objects(&service, &path)? {
                println!("{object}");
            }
        }

        Commands::Alias { action } => match action {
            AliasAction::List => config::show()?,
            AliasAction::Add {
                name,
                service,
                path,
                interface,
            } => config::add_alias(&name, &service, &path, &interface)?,
            AliasAction::Remove { name } => config::remove_alias(&name)?,
        },
    }

    Ok(())
}
