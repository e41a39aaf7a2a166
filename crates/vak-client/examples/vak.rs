// Ask several Roughtime authorities for the time and report their consensus.
//
// Run with the built-in authority list:
//   RUST_LOG=info cargo run -p vak-client --example vak --features ecosystem
//
// Or with an ecosystem file, requiring 3 agreeing authorities, and step the
// system clock (needs the `clock` feature and root):
//   cargo run -p vak-client --example vak --features ecosystem,clock -- \
//       ecosystem.json --min 3 --set

use std::error::Error;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vak_client::config::ecosystem;
use vak_client::session::AuthorityOutcome;
use vak_client::{
    Clock, OsEntropy, Session, SystemClock, Thresholds, UdpTransport, run, shuffle_authorities,
    well_known_authorities,
};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer())
        .init();

    let mut ecosystem_path = None;
    let mut min_overlaps = 2;
    let mut set_clock = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--min" => {
                min_overlaps = args
                    .next()
                    .ok_or("--min needs a value")?
                    .parse()?;
            }
            "--set" => set_clock = true,
            path => ecosystem_path = Some(path.to_string()),
        }
    }

    let mut authorities = match &ecosystem_path {
        Some(path) => ecosystem::parse(&std::fs::read_to_string(path)?)?,
        None => well_known_authorities(),
    };
    shuffle_authorities(&mut authorities, &mut OsEntropy)?;
    info!(count = authorities.len(), "authorities loaded");

    let thresholds = Thresholds::default()
        .with_min_overlaps(min_overlaps)
        .with_max_uncertainty(Duration::from_secs(2))
        .with_timeout(Duration::from_secs(2));
    let mut session = Session::new(authorities, thresholds)?;
    let mut transport = UdpTransport::new(thresholds.poll_interval);
    let mut clock = SystemClock;

    let result = run(&mut session, &mut transport, &clock, &mut OsEntropy);

    for entry in session.report().authorities {
        let status = match entry.outcome {
            AuthorityOutcome::Skipped => "skipped".to_string(),
            AuthorityOutcome::Accepted {
                adjustment_us,
                uncertainty_us,
                rtt_us,
            } => format!("{adjustment_us:+}us ±{uncertainty_us}us (rtt {rtt_us}us)"),
            AuthorityOutcome::TimedOut { invalid_responses } => {
                format!("timed out ({invalid_responses} invalid responses)")
            }
            AuthorityOutcome::TransportFailed { detail } => format!("unreachable: {detail}"),
        };
        println!("{:40} {status}", entry.authority);
    }

    let sync = result?;
    println!();
    println!(
        "Consensus of {} out of {} responses: adjust by {:+}us ±{}us",
        sync.support,
        sync.responses,
        sync.adjustment_us(),
        sync.uncertainty_us()
    );

    if set_clock {
        match clock.set_offset(sync.adjustment_us()) {
            Ok(()) => println!("System clock stepped."),
            Err(e) => warn!(error = %e, "could not step the system clock"),
        }
    }
    Ok(())
}
