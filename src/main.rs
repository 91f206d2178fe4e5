//! wrist-overlay: wrist-mounted VR control panel.

use wrist_overlay::backend::{self, HeadlessConfig};
use wrist_overlay::config::OverlayConfig;
use wrist_overlay::views::ViewId;
use wrist_overlay::vr::pose::Hand;

use clap::Parser;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "wrist-overlay", about = "Wrist-mounted VR control panel")]
struct Cli {
    /// Exit after N seconds (headless testing)
    #[arg(long, env = "WRIST_OVERLAY_EXIT_AFTER")]
    exit_after: Option<u64>,

    /// Tick rate in Hz
    #[arg(long, default_value = "250", env = "WRIST_OVERLAY_TICK_HZ")]
    tick_hz: u32,

    /// Wear the watch on the right hand and point with the left
    #[arg(long)]
    left_handed: bool,

    /// Hit-test overshoot factor on the panel half extents
    #[arg(long)]
    hit_margin: Option<f32>,

    /// Seconds between status log lines
    #[arg(long, default_value = "60")]
    status_interval: u64,

    /// Virtual monitors offered to the screen mirror (WxH[,WxH...])
    #[arg(long, default_value = "1920x1080")]
    monitors: String,

    /// View shown at startup
    #[arg(long)]
    start_view: Option<String>,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("wrist-overlay {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wrist_overlay=info".into()),
        )
        .init();

    info!("wrist-overlay v{} starting", env!("CARGO_PKG_VERSION"));

    let watch_hand = if cli.left_handed { Hand::Right } else { Hand::Left };
    let mut config = OverlayConfig::for_watch_hand(watch_hand);
    config.tick_hz = cli.tick_hz.max(1);
    if let Some(margin) = cli.hit_margin {
        if margin > 0.0 {
            config.hit.margin = margin;
        } else {
            eprintln!("Invalid hit margin {}, using {}", margin, config.hit.margin);
        }
    }

    let start_view = match cli.start_view.as_deref() {
        None => None,
        Some(name) => match ViewId::from_str(name) {
            Some(view) => Some(view),
            None => {
                eprintln!(
                    "Unknown view: {name}. Use: home, notifications, calendar, add-event, \
                     screens, timer, calculator, or settings"
                );
                std::process::exit(1);
            }
        },
    };

    let monitors = HeadlessConfig::parse_monitors(&cli.monitors).unwrap_or_else(|| {
        eprintln!("Invalid monitor list '{}', using 1920x1080", cli.monitors);
        HeadlessConfig::default().monitors
    });

    info!(
        "watch on {} hand, {} Hz, hit margin {:.2}",
        config.watch_hand.as_str(),
        config.tick_hz,
        config.hit.margin
    );

    let options = HeadlessConfig {
        exit_after: cli.exit_after,
        status_interval: Duration::from_secs(cli.status_interval.max(1)),
        monitors,
        start_view,
    };

    backend::run(config, options)
}
