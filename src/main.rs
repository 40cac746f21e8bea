use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fosmap::config::Config;
use fosmap::fortios::client::FosClient;
use fosmap::fortios::http::format_fos_error;
use fosmap::resource::{crud, get_all_resource_keys, get_resource, CallOptions, ResourceDef};
use fosmap::schema::{
    expand, flatten_report, parse_fos_version, ExpandContext, ExpandMode, FieldDef, FlattenContext,
    Record, ResourceData,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Manage FortiOS configuration objects through the REST API
#[derive(Parser, Debug)]
#[command(name = "fosmap", version, about, long_about = None)]
struct Args {
    /// Device address (overrides FORTIOS_ACCESS_HOSTNAME)
    #[arg(long, global = true)]
    hostname: Option<String>,

    /// Virtual domain (overrides FORTIOS_VDOM)
    #[arg(long, global = true)]
    vdom: Option<String>,

    /// Send attempts per request
    #[arg(long, global = true)]
    attempts: Option<u32>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known resource types
    Resources,
    /// Print the field table of a resource
    Schema { resource: String },
    /// Create an object from a JSON configuration file
    Create { resource: String, file: PathBuf },
    /// Read an object into configuration form
    Read { resource: String, id: Option<String> },
    /// Update an object from a JSON configuration file
    Update {
        resource: String,
        file: PathBuf,
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete an object (singletons are reset)
    Delete { resource: String, id: Option<String> },
    /// Map a configuration file to its wire form without contacting the device
    Expand {
        resource: String,
        file: PathBuf,
        /// API version for version-dependent fields
        #[arg(long)]
        api_version: Option<String>,
        /// Emit the reset body used when deleting
        #[arg(long)]
        clear: bool,
    },
    /// Map a wire JSON object to configuration form without contacting the device
    Flatten {
        resource: String,
        file: PathBuf,
        #[arg(long)]
        api_version: Option<String>,
    },
    /// Save connection defaults to the config file
    Configure {
        #[arg(long)]
        insecure: Option<bool>,
        #[arg(long)]
        cabundlefile: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", log_path.display(), e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("fosmap started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("fosmap").join("fosmap.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".fosmap").join("fosmap.log");
    }
    PathBuf::from("fosmap.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        eprintln!("{}", format_fos_error(&err));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();
    if let Some(hostname) = &args.hostname {
        config.hostname = Some(hostname.clone());
    }
    if let Some(vdom) = &args.vdom {
        config.vdom = Some(vdom.clone());
    }
    if let Some(attempts) = args.attempts {
        config.attempts = Some(attempts);
    }

    let mut opts = CallOptions::new().with_attempts(config.effective_attempts());
    if let Some(vdom) = &config.vdom {
        opts = opts.with_vdom(vdom.clone());
    }

    match args.command {
        Command::Resources => {
            let keys: Vec<Value> = get_all_resource_keys()
                .into_iter()
                .filter_map(get_resource)
                .map(|def| json!({"resource": def.key, "path": def.path, "description": def.description}))
                .collect();
            print_json(&keys)
        }
        Command::Schema { resource } => {
            let def = lookup(&resource)?;
            print_json(&json!({
                "resource": def.key,
                "path": def.path,
                "mkey": def.mkey,
                "fields": describe_fields(&def.fields),
            }))
        }
        Command::Create { resource, file } => {
            let def = lookup(&resource)?;
            let client = FosClient::from_config(&config)?;
            let mut data = ResourceData::new(read_record(&file)?);
            crud::create(def, &mut data, &client, &opts).await?;
            print_state(&data)
        }
        Command::Read { resource, id } => {
            let def = lookup(&resource)?;
            let client = FosClient::from_config(&config)?;
            let id = id.unwrap_or_else(|| def.type_name());
            let data = crud::import_state(def, &id, &client, &opts).await?;
            print_state(&data)
        }
        Command::Update { resource, file, id } => {
            let def = lookup(&resource)?;
            let client = FosClient::from_config(&config)?;
            let mut data = ResourceData::new(read_record(&file)?);
            if let Some(id) = id {
                data.set_id(id);
            }
            crud::update(def, &mut data, &client, &opts).await?;
            print_state(&data)
        }
        Command::Delete { resource, id } => {
            let def = lookup(&resource)?;
            let client = FosClient::from_config(&config)?;
            let mut data = ResourceData::default().with_id(id.unwrap_or_else(|| def.type_name()));
            crud::delete(def, &mut data, &client, &opts).await?;
            print_json(&json!({"deleted": def.key}))
        }
        Command::Expand {
            resource,
            file,
            api_version,
            clear,
        } => {
            let def = lookup(&resource)?;
            let data = ResourceData::new(read_record(&file)?);
            let version = api_version.as_deref().and_then(parse_fos_version);
            let ctx = ExpandContext {
                mode: if clear { ExpandMode::Clear } else { ExpandMode::Apply },
                version: version.as_ref(),
            };
            let wire = expand(&data, &def.fields, &ctx)?;
            print_json(&wire)
        }
        Command::Flatten {
            resource,
            file,
            api_version,
        } => {
            let def = lookup(&resource)?;
            let wire = read_json(&file)?;
            let version = api_version.as_deref().and_then(parse_fos_version);
            let ctx = FlattenContext {
                prior: None,
                version: version.as_ref(),
            };
            let out = flatten_report(&wire, &def.fields, &ctx);
            for error in &out.errors {
                eprintln!("warning: {}", error);
            }
            print_json(&out.record)
        }
        Command::Configure {
            insecure,
            cabundlefile,
        } => {
            let mut saved = Config::config_path()
                .filter(|p| p.exists())
                .map(|p| Config::load_from(&p))
                .transpose()?
                .unwrap_or_default();
            if let Some(hostname) = args.hostname {
                saved.hostname = Some(hostname);
            }
            if let Some(vdom) = args.vdom {
                saved.vdom = Some(vdom);
            }
            if let Some(attempts) = args.attempts {
                saved.attempts = Some(attempts);
            }
            if let Some(insecure) = insecure {
                saved.insecure = insecure;
            }
            if let Some(bundle) = cabundlefile {
                saved.cabundlefile = Some(bundle);
            }
            saved.save()?;
            print_json(&saved)
        }
    }
}

fn lookup(resource: &str) -> Result<&'static ResourceDef> {
    get_resource(resource).with_context(|| format!("Unknown resource: {}", resource))
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_record(path: &Path) -> Result<Record> {
    let value = read_json(path)?;
    serde_json::from_value(value)
        .with_context(|| format!("{} is not a configuration object", path.display()))
}

fn describe_fields(fields: &[FieldDef]) -> Vec<Value> {
    fields
        .iter()
        .map(|f| {
            let mut entry = json!({
                "name": f.name,
                "wire_key": f.wire_key(),
                "type": format!("{:?}", f.field_type).to_lowercase(),
                "mode": format!("{:?}", f.mode).to_lowercase(),
            });
            if f.sensitive {
                entry["sensitive"] = json!(true);
            }
            if let Some(key) = &f.sort_by {
                entry["sort_by"] = json!(key);
            }
            if f.is_block() {
                entry["fields"] = json!(describe_fields(&f.fields));
            }
            entry
        })
        .collect()
}

fn print_state(data: &ResourceData) -> Result<()> {
    print_json(&json!({"id": data.id(), "state": data.state()}))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
