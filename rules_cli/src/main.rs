use anyhow::Context;
use rules_core::tablecmd::{ApplyStatus, try_apply_table_line};
use rules_core::{PickedImage, RowId, RuleTable, Settings, column_label, display_lines};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

fn print_help() {
    println!(
        r#"Rules CLI

            Commands:
            repl [settings.json]
            sample
            save-default-settings <settings.json>
            format <filter spec>

            Examples:
            cargo run -p rules_cli -- repl
            cargo run -p rules_cli -- save-default-settings settings.json
            cargo run -p rules_cli -- repl settings.json
            cargo run -p rules_cli -- format "c tags | o contains | v onsale"
        "#
    );
}

fn load_settings(path: Option<&String>) -> anyhow::Result<Settings> {
    match path {
        Some(p) => Settings::load_json_file(p)
            .with_context(|| format!("failed to load settings '{p}'")),
        None => Ok(Settings::default()),
    }
}

/// Reads the image for `assign` straight from disk.
fn pick_from_path(path: &str) -> anyhow::Result<PickedImage> {
    let bytes = fs::read(path).with_context(|| format!("read image file '{path}'"))?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    Ok(PickedImage::new(name, bytes))
}

fn print_table(table: &RuleTable) {
    let headers: Vec<String> = (0..table.columns())
        .map(|i| {
            let mark = if table.selected_column() == Some(i) { "*" } else { "" };
            format!("{}{}", column_label(i), mark)
        })
        .collect();
    println!("Columns: {}", headers.join(" | "));

    if table.rules().is_empty() {
        println!("(no rules yet)");
        return;
    }

    for (pos, rule) in table.rules().iter().enumerate() {
        let mark = if table.selected_row() == Some(pos) { ">" } else { " " };
        let cells: Vec<&str> = rule
            .variants
            .iter()
            .map(|c| c.as_ref().map(|a| a.title.as_str()).unwrap_or("-"))
            .collect();
        println!("{mark}{:>3} | id {:<4} | {}", pos + 1, rule.id, cells.join(" | "));
        for line in display_lines(&rule.filter) {
            println!("      |         |   {line}");
        }
    }
}

fn repl(settings: Settings) -> anyhow::Result<()> {
    let mut table = RuleTable::new(settings);

    println!(
        "Rules table: {} rules, {} columns",
        table.rules().len(),
        table.columns()
    );
    println!("Type 'help' for commands. 'quit' to exit.");

    loop {
        print!("rules> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            // EOF (Ctrl+D)
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match try_apply_table_line(line, &mut table) {
            ApplyStatus::Applied => {
                print_table(&table);
                continue;
            }
            ApplyStatus::Incomplete => {
                println!("(table) incomplete input…");
                continue;
            }
            ApplyStatus::BadArgument(msg) => {
                println!("(table) {msg}");
                continue;
            }
            ApplyStatus::Failed(e) => {
                println!("(table) {e}");
                continue;
            }
            ApplyStatus::NotTableCommand => {
                // fall through to the session commands below
            }
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "help" => {
                println!(
                    r#"Commands:
                        row add
                        row del <id>
                        col add
                        col del <n>          (1 = Primary, cannot be removed)
                        drag <from> <to>     (row positions)
                        select row <n> | select col <n> | select none
                        filter <id> <spec>   (c text | o text | v text)
                        assign <id> <n> <image file>
                        show
                        dump
                        quit
                        "#
                );
            }
            "quit" | "exit" => break,

            "show" => print_table(&table),

            "dump" => {
                let json = serde_json::to_string_pretty(table.rules())
                    .context("serialize rules to json")?;
                println!("{json}");
            }

            "assign" => {
                if parts.len() != 4 {
                    println!("Usage: assign <id> <n> <image file>");
                    continue;
                }
                let (Ok(id), Ok(n)) = (parts[1].parse::<RowId>(), parts[2].parse::<usize>())
                else {
                    println!("Usage: assign <id> <n> <image file>");
                    continue;
                };
                if n == 0 {
                    println!("Columns start at 1 (Primary).");
                    continue;
                }

                let picked = match pick_from_path(parts[3]) {
                    Ok(p) => p,
                    Err(e) => {
                        println!("{e:#}");
                        continue;
                    }
                };
                let mut source = Some(picked);
                match table.upload_into(id, n - 1, &mut || source.take()) {
                    Ok(_) => print_table(&table),
                    Err(e) => println!("(table) {e}"),
                }
            }

            _ => println!("Unknown command. Type 'help'."),
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "repl" => {
            let settings = load_settings(args.get(2))?;
            repl(settings)?;
        }
        "sample" => {
            let json = serde_json::to_string_pretty(&rules_core::sample_rules())
                .context("serialize sample rules")?;
            println!("{json}");
        }
        "save-default-settings" => {
            let path = args.get(2).context("missing <settings.json>")?;
            Settings::default().save_json_file(path)?;
            println!("Saved default settings to: {}", path);
        }
        "format" => {
            let spec = args[2..].join(" ");
            let tokens = rules_core::parse_filter_spec(&spec).context("parse filter spec")?;
            for line in display_lines(&tokens) {
                println!("{line}");
            }
        }
        "version" => println!("rules_cli {}", rules_core::version()),

        _ => print_help(),
    }

    Ok(())
}
