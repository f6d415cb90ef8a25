use clap::Parser;
use pipette_bridge::{
    http,
    session::{Session, DEFAULT_BAUD},
    simulator::SimulatedRobot,
    transport::{memory::MemoryTransport, serialport::SerialTransport},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{error, info, warn};

/// Web control panel for the pipette robot, bridged to its serial port.
#[derive(Parser)]
struct Cli {
    /// Serial port
    #[arg(short, long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD)]
    baud: u32,

    /// How long to wait for the robot to reply, in milliseconds
    #[arg(long, default_value_t = 1000)]
    read_timeout: u64,

    /// Address to serve the control panel on
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    listen: SocketAddr,

    /// Talk to a simulated robot instead of the serial port
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    info!("Host Git revision: {}", pipette_bridge::VERSION);

    let read_timeout = Duration::from_millis(cli.read_timeout);
    let session = if cli.simulate {
        info!("Using simulated robot");
        Session::new(MemoryTransport::new(SimulatedRobot::default()), read_timeout)
    } else {
        match SerialTransport::new(&cli.port, cli.baud, read_timeout) {
            Ok(transport) => {
                info!("Serial initialized on {} ({} baud)", cli.port, cli.baud);
                Session::new(transport, read_timeout)
            }
            Err(e) => {
                error!("Failed to open serial port {}: {}", cli.port, e);
                warn!("Continuing without a device, commands will fail");
                Session::detached(read_timeout)
            }
        }
    };

    let listener = match tokio::net::TcpListener::bind(cli.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to listen on {}: {}", cli.listen, e);
            ::std::process::exit(1);
        }
    };
    info!("Serving control panel on http://{}", cli.listen);

    if let Err(e) = axum::serve(listener, http::router(Arc::new(session))).await {
        error!("Server error: {e}");
        ::std::process::exit(1);
    }
}
