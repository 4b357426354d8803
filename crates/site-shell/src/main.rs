//! Mailsfinder account client CLI.

mod commands;
mod controller;
mod navbar;
mod output;
mod routes;

use clap::{Parser, Subcommand};
use commands::account::CreditKindArg;
use commands::AppContext;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "mailsfinder")]
#[command(about = "Mailsfinder account client", version)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "MAILSFINDER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Signup {
        /// Email address (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        /// Full name for the profile
        #[arg(long)]
        full_name: Option<String>,
        /// Accept the terms and conditions (prompted if omitted)
        #[arg(long)]
        agree_terms: bool,
    },
    /// Sign in
    Login {
        /// Email address (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the current session and account
    Status,
    /// Request a password reset email
    ResetPassword {
        #[arg(long)]
        email: Option<String>,
    },
    /// Resend the signup confirmation email
    ResendConfirmation {
        #[arg(long)]
        email: Option<String>,
    },
    /// Credit operations
    Credits {
        #[command(subcommand)]
        command: CreditsCommand,
    },
    /// Plan operations
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },
    /// Open the dashboard with a session handoff
    Dashboard,
}

#[derive(Subcommand)]
enum CreditsCommand {
    /// Spend one credit
    Deduct {
        #[arg(value_enum)]
        kind: CreditKindArg,
    },
}

#[derive(Subcommand)]
enum PlanCommand {
    /// Change the plan
    Set {
        plan: String,
        /// Days until the plan expires
        #[arg(long, default_value_t = 30)]
        days: i64,
        /// Billing subscription reference
        #[arg(long)]
        subscription_id: Option<String>,
        /// Billing customer reference
        #[arg(long)]
        customer_id: Option<String>,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = AppContext::init(cli.format)?;

    let level = cli.log_level.as_deref().unwrap_or(&ctx.config.log_level);
    site_core::init_logging(level);

    match dispatch(&ctx, cli.command).await {
        Ok(()) => Ok(()),
        Err(e) if e.downcast_ref::<commands::UserError>().is_some() => Err(e),
        Err(e) => {
            // Unknown failure: purge local credentials so a broken state
            // never survives looking signed in.
            tracing::error!("Unexpected failure: {:#}", e);
            let _ = ctx.controller.sessions().store().clear_session();
            anyhow::bail!("Something went wrong. Please try again.")
        }
    }
}

async fn dispatch(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Signup {
            email,
            full_name,
            agree_terms,
        } => commands::auth::signup(ctx, email, full_name, agree_terms).await,
        Command::Login { email } => commands::auth::login(ctx, email).await,
        Command::Logout => commands::auth::logout(ctx).await,
        Command::Status => commands::auth::status(ctx).await,
        Command::ResetPassword { email } => commands::auth::reset_password(ctx, email).await,
        Command::ResendConfirmation { email } => {
            commands::auth::resend_confirmation(ctx, email).await
        }
        Command::Credits { command } => match command {
            CreditsCommand::Deduct { kind } => commands::account::deduct(ctx, kind).await,
        },
        Command::Plan { command } => match command {
            PlanCommand::Set {
                plan,
                days,
                subscription_id,
                customer_id,
            } => commands::account::set_plan(ctx, plan, days, subscription_id, customer_id).await,
        },
        Command::Dashboard => commands::account::dashboard(ctx).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&e.to_string(), &format);
        std::process::exit(1);
    }
}
