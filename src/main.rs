use env_logger::Env;
use log::error;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match mailburst::cli::run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    }
}
