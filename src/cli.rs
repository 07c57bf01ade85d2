use std::io::{self, BufRead, Write};

use clap::Parser;

use natureseek::config::{init_tracing, CliConfig};
use natureseek::console::{Backend, Console, Outcome, RemoteBackend};
use natureseek::parser;
use natureseek::storage::JsonFileStore;
use natureseek::NatureDb;

fn main() {
    let config = CliConfig::parse();
    init_tracing(Some(config.log.as_deref().unwrap_or("warn")));

    print_banner();

    if let Some(path) = config.local {
        println!("[OK] Using local table {}", path.display());
        repl(Console::new(NatureDb::new(JsonFileStore::new(path))));
        return;
    }

    let remote = RemoteBackend::new(&config.host);
    match remote.ping() {
        Ok(()) => println!("[OK] Connected to natureseek at {}", config.host),
        Err(e) => {
            println!("[!] Could not reach server at {}: {}", config.host, e);
            println!("    Start it with 'natureseek', or pass --local <file>.");
            return;
        }
    }
    repl(Console::new(remote));
}

fn print_banner() {
    println!("\n==================================================");
    println!("   natureseek console - crops, pests, pesticides");
    println!("==================================================\n");
    println!("Type 'HELP' for supported commands or 'EXIT' to quit.\n");
}

fn repl<B: Backend>(mut console: Console<B>) {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("natureseek> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        match parser::parse_command(&line) {
            Ok(cmd) => match console.execute(cmd) {
                Ok(Outcome::Output(text)) => println!("{}\n", text),
                Ok(Outcome::Exit) => break,
                Err(e) => println!("[Error] {}\n", e),
            },
            Err(e) => {
                println!("[Syntax Error] {}", e);
                if line.trim().to_uppercase().starts_with("REGISTER") {
                    println!("    Hint: REGISTER crop=\"Soja\" pests=\"Lagarta, Percevejo\" area=10.5 cities=\"Sorriso\"");
                } else if line.trim().to_uppercase().starts_with("FIND") {
                    println!("    Hint: FIND WHERE cities~\"sorriso\" AND pests~\"lagarta\"");
                }
                println!();
            }
        }
    }
}
