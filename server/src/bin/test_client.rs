//! Headless probe client: connects to a running server, adds one ball and
//! prints the decoded event stream for a few seconds.

use shared::protocol::Event;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let stream = TcpStream::connect(&addr).await?;
    println!("Connected to {}", addr);

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // Drop one ball near the top of the default world.
    write_half.write_all(b"A 1.0 10 100 100 25 0\n").await?;
    println!("Requested a ball, watching updates...");

    let mut my_ball = None;
    let deadline = Duration::from_secs(5);

    loop {
        let line = match timeout(deadline, lines.next_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                println!("Server closed the connection");
                break;
            }
            Ok(Err(e)) => {
                println!("Read error: {}", e);
                break;
            }
            Err(_) => {
                println!("No updates for {:?}, done", deadline);
                break;
            }
        };

        match Event::parse(&line) {
            Ok(Event::Added { id, position, .. }) => {
                println!("Ball {} exists at ({}, {})", id, position.x, position.y);
                if my_ball.is_none() {
                    my_ball = Some(id);
                }
            }
            Ok(Event::Updated { id, position, velocity }) => {
                println!(
                    "Ball {}: pos=({:.1}, {:.1}) vel=({:.1}, {:.1})",
                    id, position.x, position.y, velocity.x, velocity.y
                );
            }
            Ok(Event::Removed { id }) => {
                println!("Ball {} removed", id);
            }
            Err(e) => {
                println!("Undecodable line {:?}: {}", line, e);
            }
        }
    }

    if let Some(id) = my_ball {
        println!("Cleaning up ball {}", id);
        write_half
            .write_all(format!("D {}\n", id).as_bytes())
            .await?;
    }

    Ok(())
}
