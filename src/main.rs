//! tpip - pip mirror benchmark and switcher
//!
//! Measures latency and download speed of package-index mirrors and
//! writes the fastest one into pip's configuration.

use clap::{CommandFactory, Parser};
use std::process;
use tpip::{
    app::App,
    cli::Cli,
    error::{AppError, ErrorReporter},
};

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue at: https://github.com/caoergou/tpip/issues");
        process::exit(1);
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(1);
    }

    if cli.color {
        colored::control::set_override(true);
    } else if cli.no_color {
        colored::control::set_override(false);
    }

    if cli.should_show_topic_help() {
        print!("{}", cli.display_help());
        return;
    }

    if cli.command.is_none() {
        let mut command = Cli::command();
        if command.print_help().is_err() {
            process::exit(1);
        }
        println!();
        return;
    }

    let verbose = cli.verbose || cli.debug;
    let reporter = ErrorReporter::new(cli.use_colors(), verbose);

    let result = match App::new(cli) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        reporter.report_error(&e);

        if !verbose {
            print_error_suggestions(&e);
        }

        process::exit(e.exit_code());
    }
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format (see `tpip --help-topic env`)");
            eprintln!("  - TPIP_MIRRORS takes comma-separated name=url pairs");
            eprintln!("  - Timeouts and test times must be between 1 and 300 seconds");
        }
        AppError::MirrorNotFound(_) => {
            eprintln!();
            eprintln!("Run `tpip mirrors` to list the available mirror names.");
        }
        AppError::NoReachableMirror(_) | AppError::Network(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection and proxy settings");
            eprintln!("  - Increase the probe timeout with --timeout");
            eprintln!("  - Name a mirror explicitly: tpip set <MIRROR>");
        }
        AppError::PackageManager(_) | AppError::Io(_) => {
            eprintln!();
            eprintln!("pip troubleshooting:");
            eprintln!("  - Make sure `python -m pip --version` works");
            eprintln!("  - Point TPIP_PYTHON at another interpreter, e.g. TPIP_PYTHON=python3.11");
        }
        _ => {}
    }
}
