// CLI entry point for the Sound Blocks relay.
//
// Starts a standalone relay that board clients connect to. The relay stores
// and re-broadcasts board events; state lives only as long as the process.
// See `server.rs` for the networking architecture and `session.rs` for the
// session state.
//
// Usage:
//   relay [OPTIONS]
//     --port <PORT>     Listen port (default: 3000)
//     --bind <ADDR>     Listen address (default: 127.0.0.1)
//     --write-timeout-ms <MS>
//                       Drop a client whose socket write blocks this long
//                       (default: 5000)
//
// Logging goes to stderr through `tracing`; set `RUST_LOG` to adjust
// (default `info`).

use std::time::Duration;

use sound_blocks_relay::server::{RelayConfig, start_relay};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = parse_args();

    let (_handle, addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start relay: {e}");
            std::process::exit(1);
        }
    };

    println!("Relay listening on {addr}");
    println!("Press Ctrl+C to stop.");

    // The relay runs on its own threads; SIGINT/SIGTERM end the process and
    // the board with it.
    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}

/// Parse command-line arguments into a `RelayConfig`. Uses simple
/// `std::env::args()` matching.
fn parse_args() -> RelayConfig {
    let mut config = RelayConfig::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--bind" => {
                i += 1;
                config.bind_addr = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--bind requires an address");
                    std::process::exit(1);
                });
            }
            "--write-timeout-ms" => {
                i += 1;
                let ms: u64 = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .filter(|&ms| ms > 0)
                    .unwrap_or_else(|| {
                        eprintln!("--write-timeout-ms requires a positive number");
                        std::process::exit(1);
                    });
                config.write_timeout = Duration::from_millis(ms);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn print_usage() {
    println!("Usage: relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>     Listen port (default: 3000)");
    println!("  --bind <ADDR>     Listen address (default: 127.0.0.1)");
    println!("  --write-timeout-ms <MS>");
    println!("                    Drop a client whose writes block this long (default: 5000)");
    println!("  --help, -h        Show this help");
}
