// Entrypoint: parse arguments, run the single request and print one line.
// Configuration errors print their message alone and exit 1; malformed
// responses bubble up to `anyhow`.

use bitlyfy::cli::Cli;
use clap::Parser;
use std::process;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match cli.execute() {
        Ok(line) => {
            println!("{}", line);
            Ok(())
        }
        Err(e) if e.is_configuration() => {
            eprintln!("{}", e);
            process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
