use std::error::Error;

use otp::{Direction, cli::ServerCli};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli: ServerCli = otp::cli::parse();
    otp::cli::run_server(&cli, Direction::Encode)?;
    Ok(())
}
