mod cli;
mod config;
mod database;
mod devices;
mod error;
mod handoff;
mod maintenance;

use cli::Cli;
use log::error;

fn main() {
    // On success this function never returns: the process image is
    // replaced by the media server. Reaching the error branch means the
    // startup sequence could not complete.
    if let Err(err) = Cli::handle_command_line() {
        error!("{:?}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
