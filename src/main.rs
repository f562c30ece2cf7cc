#[tokio::main]
async fn main() {
    if let Err(error) = church_feeds_lib::run().await {
        eprintln!("church-feeds failed to start: {error}");
        std::process::exit(1);
    }
}
