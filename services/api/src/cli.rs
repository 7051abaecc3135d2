use crate::infra::Components;
use crate::server;
use clap::{Args, Parser, Subcommand};
use kyc_dossier::auth::TokenVerifier;
use kyc_dossier::config::AppConfig;
use kyc_dossier::error::AppError;
use kyc_dossier::risk::AggregationResult;

#[derive(Parser, Debug)]
#[command(
    name = "KYC Dossier Service",
    about = "Run the KYC dossier API or check a single tax identifier from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Aggregate registry and sanctions data for one CPF or CNPJ
    Check(CheckArgs),
    /// Mint a bearer token for local testing
    Token(TokenArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// CPF or CNPJ, punctuation allowed
    document: String,
    /// Postal code used for the address lookup
    #[arg(long)]
    postal_code: Option<String>,
    /// Print the full aggregation as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TokenArgs {
    /// Subject (user id) of the token
    #[arg(long)]
    user: String,
    /// Tenant the token is scoped to
    #[arg(long)]
    tenant: String,
    #[arg(long)]
    email: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Check(args) => run_check(args).await,
        Command::Token(args) => run_token(args),
    }
}

async fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let components = Components::from_config(&config)?;
    let result = components
        .aggregator
        .check(&args.document, args.postal_code.as_deref())
        .await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&result).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        print!("{}", render_check(&result));
    }
    Ok(())
}

fn run_token(args: TokenArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let verifier = TokenVerifier::from_config(&config.auth);
    let token = verifier.issue(&args.user, &args.tenant, args.email.as_deref())?;
    println!("{token}");
    Ok(())
}

fn render_check(result: &AggregationResult) -> String {
    let mut lines = vec![
        format!("Document:    {} ({})", result.document, result.kind),
        format!("Entity:      {}", result.entity_name()),
    ];
    if !result.registration_status().is_empty() {
        lines.push(format!("Registration: {}", result.registration_status()));
    }
    lines.push(format!("Sanctions:   {}", result.sanctions_total()));
    for (name, list) in result.sanctions.lists() {
        if !list.status.is_ok() && list.status.was_queried() {
            lines.push(format!("  {name}: unavailable"));
        }
    }
    lines.push(format!("Risk level:  {}", result.risk_level()));

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}
