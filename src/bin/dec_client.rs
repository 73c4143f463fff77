use std::process::ExitCode;

use otp::Direction;

fn main() -> ExitCode {
    // Initialize env_logger; logs go to STDERR so STDOUT only carries the result
    env_logger::init();

    otp::cli::client_main(Direction::Decode)
}
