use std::{error::Error, io};

use otp::cli::{KeygenCli, parse, run_keygen};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli: KeygenCli = parse();
    run_keygen(cli.length as usize, io::stdout().lock())?;
    Ok(())
}
