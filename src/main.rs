use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    worm_farmer::run().await
}
