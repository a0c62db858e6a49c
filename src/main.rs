use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use promo_panel::application::checkout::{CheckoutOrchestrator, CheckoutOutcome};
use promo_panel::application::presence::PresenceSession;
use promo_panel::config::{PanelSettings, SettingsLayer};
use promo_panel::domain::checkout::CheckoutStep;
use promo_panel::domain::presence::PresenceSimulator;
use promo_panel::infrastructure::simulated::SimulatedGateway;
use promo_panel::interfaces::contact_link::build_contact_link;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Origin of the page hosting the panel
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Seed for the presence walk and label selection
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the link behind the contact button
    Link {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
    /// Run the online-count simulation for a number of ticks
    Presence {
        #[arg(long, default_value_t = 5)]
        ticks: usize,
        /// Tick period in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Run one checkout attempt against the simulated gateway
    Checkout {
        #[arg(long)]
        public_key: Option<String>,
        /// Make the gateway fail at this step
        #[arg(long, value_enum)]
        fail_at: Option<FailAt>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FailAt {
    Initialize,
    CreateSession,
    Redirect,
}

impl From<FailAt> for CheckoutStep {
    fn from(step: FailAt) -> Self {
        match step {
            FailAt::Initialize => CheckoutStep::Initialize,
            FailAt::CreateSession => CheckoutStep::CreateSession,
            FailAt::Redirect => CheckoutStep::Redirect,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut overrides = SettingsLayer {
        page_origin: cli.origin.clone(),
        seed: cli.seed,
        ..Default::default()
    };
    match &cli.command {
        Command::Link { username, message } => {
            overrides.telegram_username = username.clone();
            overrides.prefilled_message = message.clone();
        }
        Command::Presence { interval_ms, .. } => overrides.tick_ms = *interval_ms,
        Command::Checkout { public_key, .. } => {
            overrides.payment_public_key = public_key.clone();
        }
    }
    let settings = PanelSettings::load_with_overrides(
        cli.config.as_deref(),
        |key| std::env::var(key).ok(),
        overrides,
    )
    .into_diagnostic()?;

    match cli.command {
        Command::Link { .. } => {
            println!("{}", build_contact_link(&settings.offer, &settings.page_origin));
        }
        Command::Presence { ticks, .. } => run_presence(&settings, ticks).await?,
        Command::Checkout { fail_at, .. } => run_checkout(&settings, fail_at).await,
    }

    Ok(())
}

async fn run_presence(settings: &PanelSettings, ticks: usize) -> Result<()> {
    let simulator = match settings.seed {
        Some(seed) => PresenceSimulator::from_seed(seed),
        None => PresenceSimulator::from_entropy(),
    };
    let session = PresenceSession::start(simulator, settings.tick_period);
    let mut updates = session.subscribe();

    let initial = session.current();
    println!("{} happy customers", initial.happy_customers_label());
    println!("{} online", initial.online_count);
    for _ in 0..ticks {
        updates.changed().await.into_diagnostic()?;
        let presence = *updates.borrow_and_update();
        println!("{} online", presence.online_count);
    }

    session.dispose();
    Ok(())
}

async fn run_checkout(settings: &PanelSettings, fail_at: Option<FailAt>) {
    let mut gateway = SimulatedGateway::new();
    if let Some(step) = fail_at {
        gateway = gateway.failing_at(step.into());
    }
    let rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let orchestrator =
        CheckoutOrchestrator::with_rng(Box::new(gateway.clone()), &settings.page_origin, rng);
    let mut transitions = orchestrator.transitions();

    let outcome = orchestrator
        .start_checkout(&settings.offer, settings.public_key.as_deref())
        .await;

    while let Ok(state) = transitions.try_recv() {
        println!("state: {state}");
    }
    match outcome {
        CheckoutOutcome::Redirected(session) => {
            println!("session: {}", session.session_id);
            if let Some(target) = gateway.redirect_target().await {
                println!("redirect: {target}");
            }
        }
        CheckoutOutcome::Failed(error) => println!("message: {}", error.user_message()),
        CheckoutOutcome::AlreadyInProgress => println!("message: checkout already in progress"),
    }
}
