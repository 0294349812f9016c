use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use workercfg::{
    config::{self, BindingType, Config, VarValue},
    writer::{self, BindingDef},
    ConfigError, ConfigResult,
};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Inspect and edit worker deployment configuration files.",
    long_about = "Reads wrangler.toml, wrangler.json and wrangler.jsonc files, resolves per-environment settings, and applies minimal-diff edits for bindings, variables, cron triggers and environments."
)]
struct Args {
    /// Explicit configuration file. Skips discovery.
    #[arg(short, long, env = "WORKERCFG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory to search (the directory itself, then its parent).
    #[arg(short, long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Log filter, overridden by RUST_LOG when set.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the path of the configuration file in use
    Find,
    /// List every project under a directory tree
    Discover {
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Show the resolved settings of one environment
    Show {
        #[arg(short, long, default_value = "default")]
        env: String,
    },
    /// List environment names and their resolved worker names
    Envs,
    /// Append a binding
    AddBinding {
        #[arg(short, long, default_value = "default")]
        env: String,
        /// kv, r2, d1, service, durable_object, queue, queue_consumer, ai, vectorize, hyperdrive, analytics_engine
        #[arg(short = 't', long = "type")]
        kind: BindingType,
        #[arg(short, long, default_value = "")]
        name: String,
        #[arg(short, long, default_value = "")]
        id: String,
        #[arg(short = 'r', long, default_value = "")]
        resource_name: String,
    },
    /// Set a variable (values are written as strings unless --typed)
    SetVar {
        #[arg(short, long, default_value = "default")]
        env: String,
        name: String,
        value: String,
        /// Parse the value as JSON (numbers, booleans, arrays)
        #[arg(long)]
        typed: bool,
    },
    /// Remove a variable
    DeleteVar {
        #[arg(short, long, default_value = "default")]
        env: String,
        name: String,
    },
    /// Add a cron trigger
    AddCron { cron: String },
    /// Remove a cron trigger
    DeleteCron { cron: String },
    /// Declare a new environment
    AddEnv { name: String },
    /// Remove an environment and everything under it
    DeleteEnv { name: String },
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> ConfigResult<()> {
    if let Command::Discover { ref root } = args.command {
        let projects = config::discover_projects(root);
        if args.json {
            let list: Vec<_> = projects
                .iter()
                .map(|p| serde_json::json!({ "dir": p.dir, "config": p.config }))
                .collect();
            print_json(&list);
        } else {
            for project in projects {
                println!("{}", project.config.display());
            }
        }
        return Ok(());
    }

    let path = resolve_path(&args)?;

    match args.command {
        Command::Discover { .. } => {}
        Command::Find => println!("{}", path.display()),
        Command::Show { env } => {
            let config = config::parse(&path)?;
            show_env(&config, &env, args.json);
        }
        Command::Envs => {
            let config = config::parse(&path)?;
            if args.json {
                let envs: Vec<_> = config
                    .env_names()
                    .iter()
                    .map(|e| serde_json::json!({ "env": e, "name": config.resolved_env_name(e) }))
                    .collect();
                print_json(&envs);
            } else {
                for env in config.env_names() {
                    println!("{:<16} {}", env, config.resolved_env_name(&env));
                }
            }
        }
        Command::AddBinding {
            env,
            kind,
            name,
            id,
            resource_name,
        } => {
            let def = BindingDef::new(kind, name, id).with_resource_name(resource_name);
            writer::add_binding(&path, &env, &def)?;
            show_env(&config::parse(&path)?, &env, args.json);
        }
        Command::SetVar {
            env,
            name,
            value,
            typed,
        } => {
            let value = if typed {
                serde_json::from_str::<VarValue>(&value)
                    .map_err(|e| ConfigError::invalid(format!("--typed value is not JSON: {e}")))?
            } else {
                VarValue::Text(value)
            };
            writer::set_var(&path, &env, &name, value)?;
            show_env(&config::parse(&path)?, &env, args.json);
        }
        Command::DeleteVar { env, name } => {
            writer::delete_var(&path, &env, &name)?;
            show_env(&config::parse(&path)?, &env, args.json);
        }
        Command::AddCron { cron } => {
            writer::add_cron(&path, &cron)?;
            print_crons(&config::parse(&path)?, args.json);
        }
        Command::DeleteCron { cron } => {
            writer::delete_cron(&path, &cron)?;
            print_crons(&config::parse(&path)?, args.json);
        }
        Command::AddEnv { name } => {
            writer::add_environment(&path, &name)?;
            show_env(&config::parse(&path)?, &name, args.json);
        }
        Command::DeleteEnv { name } => {
            writer::delete_environment(&path, &name)?;
            let config = config::parse(&path)?;
            println!("{}", config.env_names().join(", "));
        }
    }

    Ok(())
}

fn resolve_path(args: &Args) -> ConfigResult<PathBuf> {
    if let Some(ref path) = args.config {
        return Ok(path.clone());
    }
    config::find_config_up(&args.dir).ok_or_else(|| {
        ConfigError::not_found(format!(
            "{}.{{jsonc,json,toml}} in {}",
            config::CONFIG_BASE_NAME,
            args.dir.display()
        ))
    })
}

fn show_env(config: &Config, env: &str, json: bool) {
    if json {
        print_json(&serde_json::json!({
            "env": env,
            "name": config.resolved_env_name(env),
            "compatibility_date": config.resolved_compat_date(env),
            "routes": config.env_routes(env),
            "bindings": config.env_bindings(env),
            "vars": config.env_vars(env),
        }));
        return;
    }

    println!("{} ({})", config.path.display(), config.format);
    println!("env:                {}", env);
    println!("name:               {}", config.resolved_env_name(env));
    println!(
        "compatibility_date: {}",
        config.resolved_compat_date(env).unwrap_or("-")
    );
    for route in config.env_routes(env) {
        match route.zone_name {
            Some(ref zone) => println!("route:              {} (zone {})", route.pattern, zone),
            None => println!("route:              {}", route.pattern),
        }
    }
    for binding in config.env_bindings(env) {
        println!(
            "binding:            {:<16} {:<18} {}",
            binding.name,
            binding.kind.label(),
            binding.resource_id
        );
    }
    for (name, value) in config.env_vars(env) {
        println!("var:                {} = {}", name, value);
    }
    for dup in config.duplicate_binding_names(env) {
        println!("warning:            binding '{}' is declared more than once", dup);
    }
}

fn print_crons(config: &Config, json: bool) {
    if json {
        print_json(&config.crons);
    } else {
        for cron in &config.crons {
            println!("{}", cron);
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("error: {e}"),
    }
}
