mod api;
mod app;
mod cli;
mod config;
mod logging;
mod submit;
mod upload;
mod utils;

fn main() {
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    if let Err(err) = cli::run_from_args() {
        tracing::error!("{:#}", err);
        eprintln!("activity-uploader error: {:#}", err);
        std::process::exit(1);
    }
}
