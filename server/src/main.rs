use clap::Parser;
use server::network::Server;

/// Authoritative 2D ball physics server speaking a line-oriented text
/// protocol over TCP.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (simulation updates per second)
    #[clap(short, long, default_value = "60")]
    tick_rate: u32,
    /// World width in world units
    #[clap(long, default_value = "1024")]
    width: f32,
    /// World height in world units
    #[clap(long, default_value = "1024")]
    height: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    let mut server = Server::new(&address, args.tick_rate, args.width, args.height).await?;
    server.run().await;

    Ok(())
}
