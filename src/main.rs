use backend_proxy::fixture::Fixture;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "backend-proxy", version, about = "Generate $httpBackend registration scripts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the script a fixture file turns into
    Render {
        /// Fixture file (JSON)
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Bootstrap)]
        mode: Mode,
        /// Field on $httpBackend that receives the context
        #[arg(long, default_value = "context")]
        context_field: String,
        /// CSS selector of the element carrying the app's injector
        #[arg(long, default_value = "body")]
        root_element: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Angular module run while the next page bootstraps
    Bootstrap,
    /// Function body run against an already loaded page
    Immediate,
}

fn run(cli: Cli) -> backend_proxy::Result<()> {
    match cli.command {
        Command::Render { file, mode, context_field, root_element } => {
            let fixture = Fixture::from_path(&file)?;
            let script = match mode {
                Mode::Bootstrap => fixture.render_bootstrap(&context_field)?,
                Mode::Immediate => fixture.render_immediate(&context_field, &root_element)?,
            };
            println!("{}", script);
            Ok(())
        }
    }
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("backend-proxy: {}", e);
        std::process::exit(1);
    }
}
