//! report-runner: headless report builder for the loyalty program.
//!
//! Usage:
//!   report-runner --seed 12345 --role admin
//!   report-runner --input table.json --role store --store "Loja Campinas 01"
//!   report-runner --db campaigns.db --role architect --entity 12345678901
//!   report-runner --seed 7 --ipc-mode        (JSON requests on stdin)

use anyhow::Result;
use loyalty_core::{
    config::ReportConfig,
    demo::{self, DemoParams},
    engine::{Report, ReportEngine, ReportRequest},
    evolution::format_thousands_br,
    report::CampaignBook,
    store::CampaignStore,
    transaction::TransactionTable,
    types::{season_label, Season},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Report { request: ReportRequest },
    Reload { seed: u64 },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let seasons = parse_arg(&args, "--seasons", 0u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let input = flag_value(&args, "--input");
    let role = flag_value(&args, "--role").unwrap_or("admin");
    let season = flag_value(&args, "--season").and_then(|s| s.parse::<Season>().ok());

    let config = match ReportConfig::load(data_dir) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("config: {e}; using built-in defaults");
            ReportConfig::default_test()
        }
    };

    let mut params = config.settings.demo.clone();
    if seasons > 0 {
        params.seasons = seasons;
    }
    let table = match input {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
            TransactionTable::from_json(&content)?
        }
        None => demo::generate(seed, &params),
    };

    if !ipc_mode {
        println!("{} - report-runner", config.settings.program_name);
        println!("  seed:      {seed}");
        println!("  rows:      {}", table.len());
        println!("  seasons:   {:?}", table.seasons());
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let store = CampaignStore::open(db)?;
    store.migrate()?;
    log::info!("campaign store: {db} journal={}", store.journal_mode()?);

    let mut engine = ReportEngine::new(config, table);

    if ipc_mode {
        return run_ipc_loop(&mut engine, &store, &params);
    }

    let request = match role {
        "admin" => ReportRequest::Admin { season },
        "store" => {
            let stores: Vec<String> = match flag_value(&args, "--store") {
                Some(s) => vec![s.to_string()],
                None => engine.table().stores().into_iter().take(1).collect(),
            };
            ReportRequest::Store { stores, season }
        }
        "architect" => {
            let key = match flag_value(&args, "--entity") {
                Some(k) => k.to_string(),
                None => engine
                    .table()
                    .rows()
                    .first()
                    .map(|r| r.consolidated_key.clone())
                    .unwrap_or_default(),
            };
            ReportRequest::Architect { key, season }
        }
        other => anyhow::bail!("unknown role '{other}' (expected admin, store or architect)"),
    };

    let report = engine.report_with_store(&request, &store)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!();
    print_summary(&report);
    Ok(())
}

fn run_ipc_loop(engine: &mut ReportEngine, store: &CampaignStore, params: &DemoParams) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{err_json}")?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Report { request } => {
                let result = CampaignBook::from_store(store)
                    .and_then(|book| engine.report(&request, &book));
                match result {
                    Ok(report) => writeln!(stdout, "{}", serde_json::to_string(&report)?)?,
                    Err(e) => {
                        log::warn!("ipc: report failed: {e}");
                        writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                    }
                }
            }
            IpcCommand::Reload { seed } => {
                let changed = engine.replace_table(demo::generate(seed, params));
                let ack = serde_json::json!({
                    "reloaded": changed,
                    "fingerprint": format!("{:016x}", engine.fingerprint()),
                });
                writeln!(stdout, "{ack}")?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(report: &Report) {
    println!("═══════════════════════════════════════");
    match report {
        Report::Admin(r) => {
            println!("  {} | {}", r.program_name, season_label(r.season));
            for line in &r.kpis {
                println!(
                    "  {:<18} {:>14}  {}",
                    format!("{:?}", line.metric),
                    format_thousands_br(line.comparison.current(), 0),
                    line.display
                );
            }
            println!("  ranked entities:  {}", r.ranking.rows.len());
            println!("  stores compared:  {}", r.stores.len());
            println!(
                "  registrations:    {} ({} never bought)",
                r.registrations.len(),
                r.registrations.iter().filter(|s| !s.has_purchased).count()
            );
            for outcome in &r.prizes {
                println!("  prize '{}': {} winners", outcome.prize.title, outcome.winners.len());
            }
            for outcome in &r.store_campaigns {
                println!(
                    "  store campaign '{}': {} stores met",
                    outcome.campaign.title,
                    outcome.winners().count()
                );
            }
        }
        Report::Store(r) => {
            println!("  {} | {}", r.stores.join(", "), season_label(r.season));
            println!("  points:           {}", format_thousands_br(r.kpis.current.points, 0));
            println!("  orders:           {}", r.kpis.current.orders);
            println!("  store rank:       {:?} ({})", r.kpis.current_rank, r.kpis.movement.label());
            println!("  inactive:         {}", r.inactive.len());
        }
        Report::Architect(r) => {
            println!("  {} ({}) | {}", r.name, r.key, season_label(r.season));
            println!(
                "  tier:             {} ({:.0}% to {})",
                r.tier.label,
                r.tier.progress * 100.0,
                r.tier.next_label.as_deref().unwrap_or("-")
            );
            println!("  evolution:        {}", r.evolution.display);
            if let Some(rank) = &r.rank {
                println!("  rank:             {} ({})", rank.current_rank, rank.movement.label());
            }
        }
        Report::Empty { reason } => println!("  no report: {reason}"),
    }
    println!("═══════════════════════════════════════");
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
