use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ieee802154_phy::sim::{AckBehavior, TxBehavior};
use ieee802154_phy::util::hex::{decode_hex, format_hex_compact};
use ieee802154_phy::util::logging::log_phy_stats;
use ieee802154_phy::{
    init_logger, log_info, spawn_poll_loop, ChannelCallbacks, PhyConfig, PhyDriver, PhyEvent,
    PollLoopHandle, SimRadio, SimulatedEngine, StaticSourceMatchTable,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};

const EVENT_TIMEOUT: Duration = Duration::from_millis(500);
const SIM_UNIQUE_ID: u64 = 0x00124b_0001_0203_04;

#[derive(Parser)]
#[command(name = "phy-sim")]
#[command(about = "IEEE 802.15.4 PHY driver on a simulated radio")]
struct Cli {
    /// JSON driver configuration; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print driver statistics as JSON when done
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and print the effective configuration
    Config,
    /// Run an energy scan against a simulated ambient level
    Scan {
        #[arg(short = 'n', long, default_value = "11")]
        channel: u8,
        #[arg(short, long, default_value = "2")]
        duration_ms: u16,
        /// Ambient RSSI in dBm
        #[arg(long, default_value = "-90", allow_hyphen_values = true)]
        rssi: i8,
    },
    /// Transmit a MAC frame given in hex (FCS excluded)
    Send {
        frame: String,
        #[arg(short = 'n', long, default_value = "11")]
        channel: u8,
        /// Perform CSMA-CA before transmitting
        #[arg(long)]
        csma: bool,
        /// Simulated air behaviour
        #[arg(long, value_enum, default_value = "sent")]
        air: AirMode,
    },
    /// Receive MAC frames given in hex (FCS excluded)
    Receive {
        frames: Vec<String>,
        #[arg(short = 'n', long, default_value = "11")]
        channel: u8,
        #[arg(short, long)]
        promiscuous: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AirMode {
    /// Sent, and ACKed when requested
    Sent,
    /// Sent, but the ACK never comes
    NoAck,
    /// CSMA-CA finds the channel busy
    Busy,
    /// The hardware aborts the transmission
    Abort,
}

/// Driver on a simulated engine with a running poll loop
struct Station {
    phy: Arc<Mutex<PhyDriver<SimulatedEngine>>>,
    radio: SimRadio,
    poll: PollLoopHandle<ChannelCallbacks>,
    events: mpsc::UnboundedReceiver<PhyEvent>,
}

impl Station {
    fn start(config: PhyConfig) -> Result<Self> {
        let (engine, radio) = SimulatedEngine::new(SIM_UNIQUE_ID);
        let wake = Arc::new(Notify::new());
        let phy = PhyDriver::new(
            engine,
            config,
            Arc::new(StaticSourceMatchTable::default()),
            wake.clone(),
        )
        .context("driver init failed")?;
        radio.attach(phy.event_dispatcher());

        let phy = Arc::new(Mutex::new(phy));
        let (callbacks, events) = ChannelCallbacks::new();
        let poll = spawn_poll_loop(phy.clone(), callbacks, wake);

        Ok(Self {
            phy,
            radio,
            poll,
            events,
        })
    }

    async fn next_event(&mut self) -> Option<PhyEvent> {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .ok()
            .flatten()
    }

    async fn finish(self, print_stats: bool) -> Result<()> {
        let stats = self.phy.lock().await.stats();
        self.poll.stop().await.context("poll loop panicked")?;
        log_phy_stats(&stats);
        if print_stats {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Ok(())
    }
}

async fn run_scan(
    mut station: Station,
    channel: u8,
    duration_ms: u16,
    rssi: i8,
) -> Result<Station> {
    station
        .radio
        .set_rssi_quarter_dbm(Some(i16::from(rssi) * 4));
    station.radio.set_auto_complete_scan(true);

    {
        let mut phy = station.phy.lock().await;
        phy.enable()?;
        phy.energy_scan(channel, duration_ms)?;
    }

    loop {
        match station.next_event().await {
            Some(PhyEvent::EnergyScanDone { rssi_dbm: Some(dbm) }) => {
                println!("channel {channel}: {dbm} dBm");
                break;
            }
            Some(PhyEvent::EnergyScanDone { rssi_dbm: None }) => {
                println!("channel {channel}: invalid reading");
                break;
            }
            Some(_) => continue,
            None => bail!("energy scan did not complete"),
        }
    }
    Ok(station)
}

async fn run_send(
    mut station: Station,
    frame: &str,
    channel: u8,
    csma: bool,
    air: AirMode,
) -> Result<Station> {
    let mac = decode_hex(frame).context("invalid frame hex")?;

    let (tx, ack) = match air {
        AirMode::Sent => (TxBehavior::Sent, AckBehavior::Auto),
        AirMode::NoAck => (TxBehavior::Sent, AckBehavior::Timeout),
        AirMode::Busy => (TxBehavior::ChannelBusy, AckBehavior::Auto),
        AirMode::Abort => (TxBehavior::Abort, AckBehavior::Auto),
    };
    station.radio.set_tx_behavior(tx);
    station.radio.set_ack_behavior(ack);

    {
        let mut phy = station.phy.lock().await;
        phy.enable()?;
        phy.receive(channel)?;

        let buffer = phy.transmit_buffer();
        if !buffer.set_mac_frame(&mac) {
            bail!("frame of {} octets does not fit a PSDU", mac.len());
        }
        buffer.channel = channel;
        buffer.tx_info.csma_ca_enabled = csma;
        phy.transmit()?;
    }

    loop {
        match station.next_event().await {
            Some(PhyEvent::TransmitStarted { frame }) => {
                log_info(&format!("TX started, {} octets", frame.length()));
            }
            Some(PhyEvent::TransmitDone { result, ack, .. }) => {
                match result {
                    Ok(()) => println!("sent"),
                    Err(e) => println!("failed: {e}"),
                }
                if let Some(ack) = ack {
                    println!(
                        "ack: {} (frame pending: {})",
                        format_hex_compact(ack.payload()),
                        ack.frame_pending()
                    );
                }
                break;
            }
            Some(_) => continue,
            None => bail!("transmission did not complete"),
        }
    }
    Ok(station)
}

async fn run_receive(
    mut station: Station,
    frames: &[String],
    channel: u8,
    promiscuous: bool,
) -> Result<Station> {
    let macs = frames
        .iter()
        .map(|f| decode_hex(f).with_context(|| format!("invalid frame hex '{f}'")))
        .collect::<Result<Vec<_>>>()?;

    {
        let mut phy = station.phy.lock().await;
        phy.enable()?;
        phy.set_promiscuous(promiscuous)?;
        phy.receive(channel)?;
    }

    for mac in &macs {
        station.radio.inject_frame(mac);
        // Dropped frames produce no upcall
        if let Some(PhyEvent::ReceiveDone { frame, .. }) = station.next_event().await {
            println!(
                "rx ch={} rssi={} lqi={}: {}",
                frame.channel,
                frame.rx_info.rssi_dbm,
                frame.rx_info.lqi,
                format_hex_compact(frame.payload())
            );
        }
    }
    Ok(station)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PhyConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PhyConfig::default(),
    };

    let station = match cli.command {
        Commands::Config => {
            println!("{}", config.to_json_string()?);
            return Ok(());
        }
        Commands::Scan {
            channel,
            duration_ms,
            rssi,
        } => run_scan(Station::start(config)?, channel, duration_ms, rssi).await?,
        Commands::Send {
            frame,
            channel,
            csma,
            air,
        } => run_send(Station::start(config)?, &frame, channel, csma, air).await?,
        Commands::Receive {
            frames,
            channel,
            promiscuous,
        } => run_receive(Station::start(config)?, &frames, channel, promiscuous).await?,
    };

    station.finish(cli.stats).await
}
