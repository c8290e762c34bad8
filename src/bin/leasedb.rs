use leasedb::LeasedbInstance;
use leasedb::config::LeasedbConfig;
use leasedb::http;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Err("missing command".into());
    }
    match args[1].as_str() {
        "serve" => cmd_serve(&args[2..]),
        "migrate" => cmd_migrate(&args[2..]),
        other => {
            print_usage();
            Err(format!("unknown command: {other}"))
        }
    }
}

fn cmd_serve(args: &[String]) -> Result<(), String> {
    let db_path = parse_db_path(args);
    let port = resolve_port(args)?;
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let rt = Runtime::new().map_err(|e| format!("runtime: {e}"))?;
    rt.block_on(async {
        let instance = LeasedbInstance::open(parse_config(args), &db_path)
            .await
            .map_err(|e| format!("open {db_path}: {e}"))?;
        http::serve(Arc::new(instance), addr)
            .await
            .map_err(|e| format!("serve: {e}"))
    })
}

fn cmd_migrate(args: &[String]) -> Result<(), String> {
    let db_path = parse_db_path(args);
    let rt = Runtime::new().map_err(|e| format!("runtime: {e}"))?;
    let instance = rt
        .block_on(LeasedbInstance::open(parse_config(args), &db_path))
        .map_err(|e| format!("open {db_path}: {e}"))?;

    let report = instance.startup_migration();
    println!(
        "ok\t{}\t{}\t{}",
        report.version,
        report.applied.len(),
        if report.was_fresh { "fresh" } else { "existing" }
    );
    for step in &report.applied {
        println!("applied\t{}\t{}\t{:?}", step.index, step.label, step.elapsed);
    }
    Ok(())
}

fn parse_db_path(args: &[String]) -> String {
    parse_flag_value(args, "--db").unwrap_or_else(|| "leasedb.db".into())
}

fn parse_config(args: &[String]) -> LeasedbConfig {
    if args.iter().any(|a| a == "--in-process-lease") {
        LeasedbConfig::default()
    } else {
        LeasedbConfig::production()
    }
}

fn resolve_port(args: &[String]) -> Result<u16, String> {
    let raw = match parse_flag_value(args, "--port") {
        Some(v) => v,
        None => match std::env::var("PORT") {
            Ok(v) => v,
            Err(_) => return Ok(8080),
        },
    };
    raw.parse::<u16>()
        .map_err(|e| format!("invalid port {raw}: {e}"))
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
    for idx in 0..args.len() {
        if args[idx] == flag {
            return args.get(idx + 1).cloned();
        }
    }
    None
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  leasedb serve [--db <path>] [--port <port>] [--in-process-lease]");
    eprintln!("  leasedb migrate [--db <path>] [--in-process-lease]");
    eprintln!("serve reads the PORT environment variable when --port is absent");
}
