#[tokio::main]
async fn main() -> anyhow::Result<()> {
    restaurant::start_server().await
}
