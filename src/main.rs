use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Process,
    Stats { path: PathBuf, limit: Option<usize> },
    Help,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match parse_args(std::env::args().skip(1).collect())? {
        Command::Process => {
            let config = wrapped::config::load_config()?;
            let written = wrapped::pipeline::process(&config, &wrapped::content::NoopGenerator)?;
            log::info!("processed {} histories", written.len());
        }
        Command::Stats { path, limit } => {
            let limit = match limit {
                Some(limit) => limit,
                None => wrapped::config::load_config()?.top_limit,
            };
            let document = wrapped::pipeline::document_for_file(&path, limit)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Command::Help => print_help(),
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<Command> {
    let Some(first) = args.first() else {
        return Ok(Command::Help);
    };

    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help),
        "process" => {
            if let Some(extra) = args.get(1) {
                anyhow::bail!("unexpected argument {extra}");
            }
            Ok(Command::Process)
        }
        "stats" => {
            let mut path = None;
            let mut limit = None;
            let mut index = 1;
            while index < args.len() {
                match args[index].as_str() {
                    "--limit" => {
                        index += 1;
                        let Some(value) = args.get(index) else {
                            anyhow::bail!("--limit requires a number");
                        };
                        let parsed = value
                            .trim()
                            .parse::<usize>()
                            .map_err(|_| anyhow::anyhow!("--limit must be a number, got {value}"))?;
                        limit = Some(parsed);
                    }
                    other if path.is_none() && !other.starts_with('-') => {
                        path = Some(PathBuf::from(other));
                    }
                    other => anyhow::bail!("unknown argument {other}"),
                }
                index += 1;
            }
            let Some(path) = path else {
                anyhow::bail!("stats requires a raw history file");
            };
            Ok(Command::Stats { path, limit })
        }
        other => anyhow::bail!("unknown command {other}"),
    }
}

fn print_help() {
    println!("wrapped");
    println!("  process                        Build statistics for every raw history in the data dir");
    println!("  stats <raw.json> [--limit N]   Print one statistics document as JSON");
    println!("                                 N defaults to top_limit in config.json or WRAPPED_TOP_LIMIT");
    println!("  -h, --help                     Show this help");
}
