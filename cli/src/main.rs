//! geogate: command-line front end for the precondition gate.

use anyhow::{bail, Context};
use clap::Parser;
use geogate_gate::{GateConfig, GateEvent, GateRunner};
use geogate_geofence::{distance_km, PermissionStatus};
use geogate_network::classify;
use geogate_nullables::{NullLocation, NullNetwork, NullVerifier};
use geogate_types::{ConnectivitySnapshot, Coordinate, SessionToken, Transport};
use geogate_utils::LogFormat;
use geogate_verification::VerificationMethod;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "geogate", about = "Network and geofence precondition gate")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "GEOGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level / filter directive: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "GEOGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format: "human" or "json".
    #[arg(long, env = "GEOGATE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Great-circle distance between two points, in km.
    #[command(allow_negative_numbers = true)]
    Distance {
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
    },

    /// Classify a connectivity snapshot.
    Classify {
        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Run one gate session against scripted capabilities and print its
    /// events as JSON lines.
    Simulate {
        #[command(flatten)]
        network: NetworkArgs,

        /// Scripted positions as "lat,lon", replayed in order; the last one
        /// repeats. Defaults to the fence center.
        #[arg(long = "position", value_parser = parse_coordinate, allow_hyphen_values = true)]
        positions: Vec<Coordinate>,

        /// Deny location permission on every poll.
        #[arg(long)]
        deny_permission: bool,

        /// Location poll period for the simulation. The first poll fires
        /// immediately.
        #[arg(long, default_value_t = 1)]
        period_secs: u64,

        /// Give up after this many location polls without opening.
        #[arg(long, default_value_t = 5)]
        max_polls: u32,

        /// Verification method to dispatch once the gate opens.
        #[arg(long)]
        method: Option<VerificationMethod>,
    },

    /// Print the effective configuration as TOML.
    Config,
}

#[derive(clap::Args)]
struct NetworkArgs {
    /// Active transport: wifi, cellular, vpn, other, none.
    #[arg(long, default_value = "wifi")]
    transport: Transport,

    /// Report an active VPN.
    #[arg(long)]
    vpn: bool,

    /// Report the internet as unreachable.
    #[arg(long, conflicts_with = "reachability_unknown")]
    unreachable: bool,

    /// Report reachability as not yet determined.
    #[arg(long)]
    reachability_unknown: bool,
}

impl NetworkArgs {
    fn snapshot(&self) -> ConnectivitySnapshot {
        let reachable = if self.unreachable {
            Some(false)
        } else if self.reachability_unknown {
            None
        } else {
            Some(true)
        };
        ConnectivitySnapshot::new(reachable, self.transport, self.vpn)
    }
}

fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lon\", got {s:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    Coordinate::new(lat, lon).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GateConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => GateConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    geogate_utils::init_logging(config.logging.format, &config.logging.level);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            let a = Coordinate::new(lat1, lon1).context("first point")?;
            let b = Coordinate::new(lat2, lon2).context("second point")?;
            println!("{:.3} km", distance_km(&a, &b));
        }
        Command::Classify { network } => {
            let snapshot = network.snapshot();
            let classification = classify(&snapshot);
            println!("classification: {classification}");
            println!("label: {}", classification.label());
            match classification.block_message() {
                Some(message) => println!("blocked: {message}"),
                None => println!("blocked: no"),
            }
        }
        Command::Simulate {
            network,
            positions,
            deny_permission,
            period_secs,
            max_polls,
            method,
        } => {
            config.polling.location_period_secs = period_secs;
            config.polling.poll_immediately = true;
            simulate(
                &config,
                network.snapshot(),
                positions,
                deny_permission,
                max_polls,
                method,
            )
            .await?;
        }
        Command::Config => {
            config.validate()?;
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

enum SessionEnd {
    Ready,
    NetworkBlocked(String),
    Aborted(String),
}

/// How long a simulation may run: polls fire at 0, p, 2p, ... and the last
/// one may take up to the capability timeout to answer.
fn simulation_deadline(config: &GateConfig, max_polls: u32) -> anyhow::Result<Duration> {
    config
        .location_period()
        .checked_mul(max_polls.saturating_sub(1))
        .and_then(|polls| polls.checked_add(config.capability_timeout()))
        .context("simulation deadline overflows")
}

async fn simulate(
    config: &GateConfig,
    snapshot: ConnectivitySnapshot,
    positions: Vec<Coordinate>,
    deny_permission: bool,
    max_polls: u32,
    method: Option<VerificationMethod>,
) -> anyhow::Result<()> {
    let fence = config.validate()?;

    let network = Arc::new(NullNetwork::with_snapshot(snapshot));
    let location = Arc::new(NullLocation::new());
    if positions.is_empty() {
        location.push(Ok(*fence.center()));
    }
    for position in positions {
        location.push(Ok(position));
    }
    if deny_permission {
        location.set_permission(PermissionStatus::Denied);
    }

    let runner = GateRunner::new(config, network, location)?;
    let mut events = runner.subscribe();
    let token = runner.start_session().await;
    tracing::info!(
        session = %token,
        center = %fence.center(),
        radius_km = fence.radius_km(),
        "simulation started"
    );

    let deadline = simulation_deadline(config, max_polls)?;
    let end = match tokio::time::timeout(deadline, watch(&mut events)).await {
        Ok(end) => end?,
        Err(_elapsed) => {
            runner.abandon(token).await;
            bail!("gate did not open within {max_polls} location polls");
        }
    };

    match end {
        SessionEnd::NetworkBlocked(message) => {
            runner.abandon(token).await;
            bail!("network gate blocked: {message}");
        }
        SessionEnd::Aborted(reason) => bail!("session aborted: {reason}"),
        SessionEnd::Ready => match method {
            Some(method) => dispatch(&runner, token, method).await?,
            None => tracing::info!(session = %token, "gate open, no verification method chosen"),
        },
    }
    Ok(())
}

/// Print events until the session opens, blocks on the network or aborts.
async fn watch(events: &mut broadcast::Receiver<GateEvent>) -> anyhow::Result<SessionEnd> {
    loop {
        match events.recv().await {
            Ok(event) => {
                println!("{}", event.to_json()?);
                match event {
                    GateEvent::Ready { .. } => return Ok(SessionEnd::Ready),
                    GateEvent::NetworkBlocked { message, .. } => {
                        return Ok(SessionEnd::NetworkBlocked(message))
                    }
                    GateEvent::SessionAborted { reason, .. } => {
                        return Ok(SessionEnd::Aborted(reason))
                    }
                    _ => {}
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => bail!("event stream closed"),
        }
    }
}

async fn dispatch(
    runner: &GateRunner,
    token: SessionToken,
    method: VerificationMethod,
) -> anyhow::Result<()> {
    let mut dispatcher = runner
        .hand_off(token, Arc::new(NullVerifier::default()))
        .await?;
    let outcome = dispatcher.select(method).await?;
    println!(
        "{}",
        serde_json::json!({
            "event": "verification",
            "session": token.as_u64(),
            "method": method.tag(),
            "outcome": outcome,
        })
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinate_pairs() {
        let c = parse_coordinate("6.67, -1.56").unwrap();
        assert_eq!(c.latitude, 6.67);
        assert_eq!(c.longitude, -1.56);
        assert!(parse_coordinate("6.67").is_err());
        assert!(parse_coordinate("95,0").is_err());
        assert!(parse_coordinate("north,east").is_err());
    }

    #[test]
    fn network_flags_build_snapshots() {
        let cli = Cli::parse_from(["geogate", "classify", "--transport", "cellular", "--vpn"]);
        let Command::Classify { network } = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(
            network.snapshot(),
            ConnectivitySnapshot::new(Some(true), Transport::Cellular, true)
        );

        let cli = Cli::parse_from(["geogate", "classify", "--reachability-unknown"]);
        let Command::Classify { network } = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(network.snapshot().is_internet_reachable, None);
    }

    #[test]
    fn unreachable_conflicts_with_unknown() {
        assert!(Cli::try_parse_from([
            "geogate",
            "classify",
            "--unreachable",
            "--reachability-unknown"
        ])
        .is_err());
    }

    #[test]
    fn distance_accepts_negative_coordinates() {
        let cli = Cli::parse_from(["geogate", "distance", "6.67", "-1.56", "-33.9", "18.4"]);
        assert!(matches!(
            cli.command,
            Command::Distance { lon1, lat2, .. } if lon1 == -1.56 && lat2 == -33.9
        ));
    }

    #[test]
    fn simulate_parses_positions_and_method() {
        let cli = Cli::parse_from([
            "geogate",
            "simulate",
            "--position",
            "6.7,-1.5",
            "--position",
            "-6.7,1.5",
            "--method",
            "face-id",
        ]);
        let Command::Simulate {
            positions, method, ..
        } = cli.command
        else {
            panic!("expected simulate");
        };
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[1].latitude, -6.7);
        assert_eq!(method, Some(VerificationMethod::FaceId));
    }

    #[test]
    fn deadline_covers_every_poll_plus_timeout() {
        let config = GateConfig::default();
        assert_eq!(
            simulation_deadline(&config, 5).unwrap(),
            Duration::from_secs(4 * 60 + 30)
        );
        assert_eq!(
            simulation_deadline(&config, 0).unwrap(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn deadline_overflow_is_an_error() {
        let mut config = GateConfig::default();
        config.polling.location_period_secs = u64::MAX;
        assert!(simulation_deadline(&config, u32::MAX).is_err());
    }

    #[tokio::test]
    async fn simulation_rejects_oversized_period() {
        let mut config = GateConfig::default();
        config.polling.location_period_secs = i64::MAX as u64;
        let err = simulate(
            &config,
            ConnectivitySnapshot::online(Transport::Wifi),
            Vec::new(),
            false,
            3,
            None,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("location poll period"));
    }

    #[tokio::test]
    async fn simulation_at_center_opens_and_dispatches() {
        let mut config = GateConfig::default();
        config.polling.poll_immediately = true;
        config.polling.location_period_secs = 1;
        simulate(
            &config,
            ConnectivitySnapshot::online(Transport::Wifi),
            Vec::new(),
            false,
            3,
            Some(VerificationMethod::Fingerprint),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn simulation_behind_vpn_fails() {
        let config = GateConfig::default();
        let err = simulate(
            &config,
            ConnectivitySnapshot::new(Some(true), Transport::Vpn, true),
            Vec::new(),
            false,
            3,
            None,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Please turn off your VPN"));
    }
}
