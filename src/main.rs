#[tokio::main]
async fn main() {
    if let Err(e) = board_relay::run_with_config().await {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}
