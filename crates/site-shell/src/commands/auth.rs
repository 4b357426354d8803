//! Authentication commands.

use super::{AppContext, UserError};
use crate::navbar::TerminalNavbar;
use crate::output;
use crate::routes::Route;
use anyhow::Result;
use chrono::{DateTime, Utc};
use navbar_presenter::{MountGate, NavbarPresenter};
use std::io::{self, Write};

fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn email_or_prompt(email: Option<String>) -> Result<String> {
    match email {
        Some(email) => Ok(email),
        None => prompt_line("Email"),
    }
}

/// Render the account block the way the landing page would after this
/// command's redirect.
async fn render_account(ctx: &AppContext) {
    let navbar = NavbarPresenter::new(TerminalNavbar, MountGate::open());
    ctx.controller.reconcile(&ctx.profiles, &navbar).await;
}

pub async fn login(ctx: &AppContext, email: Option<String>) -> Result<()> {
    let email = email_or_prompt(email)?;
    let password = rpassword::prompt_password("Password: ")?;

    let outcome = ctx.controller.handle_login(&email, &password).await;
    if !outcome.success {
        if outcome.resend_available {
            eprintln!("Run `mailsfinder resend-confirmation` to get a new confirmation email.");
        }
        return Err(UserError(outcome.message).into());
    }

    output::print_success(&outcome.message, &ctx.format);
    if let Some(redirect) = outcome.redirect {
        tokio::time::sleep(redirect.delay).await;
        println!("Continuing to {}.", redirect.route.path());
        if redirect.route == Route::Home {
            render_account(ctx).await;
        }
    }
    Ok(())
}

pub async fn signup(
    ctx: &AppContext,
    email: Option<String>,
    full_name: Option<String>,
    agree_terms: bool,
) -> Result<()> {
    let full_name = match full_name {
        Some(name) => Some(name),
        None => {
            let name = prompt_line("Full name (optional)")?;
            (!name.is_empty()).then_some(name)
        }
    };
    let email = email_or_prompt(email)?;
    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    let agree_terms = if agree_terms {
        true
    } else {
        let answer = prompt_line("Accept the terms and conditions? [y/N]")?;
        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    };

    let outcome = ctx
        .controller
        .handle_signup(
            &ctx.profiles,
            full_name.as_deref(),
            &email,
            &password,
            &confirm,
            agree_terms,
        )
        .await;
    if !outcome.success {
        return Err(UserError(outcome.message).into());
    }

    output::print_success(&outcome.message, &ctx.format);
    if let Some(redirect) = outcome.redirect {
        tokio::time::sleep(redirect.delay).await;
        println!("Continuing to {}.", redirect.route.path());
        if redirect.route == Route::Home {
            render_account(ctx).await;
        }
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    let navbar = NavbarPresenter::new(TerminalNavbar, MountGate::open());
    ctx.controller.sign_out(&navbar).await;
    output::print_success("Logged out.", &ctx.format);
    Ok(())
}

pub async fn status(ctx: &AppContext) -> Result<()> {
    let navbar = NavbarPresenter::new(TerminalNavbar, MountGate::open());
    let Some(session) = ctx.controller.reconcile(&ctx.profiles, &navbar).await else {
        return Ok(());
    };

    output::print_heading("Session");
    output::print_row("User ID", &session.user_id);
    let expires = DateTime::<Utc>::from_timestamp(session.expires_at, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| session.expires_at.to_string());
    output::print_row("Expires", &expires);
    output::print_row("State", &format!("{:?}", ctx.controller.sessions().state()));
    Ok(())
}

pub async fn reset_password(ctx: &AppContext, email: Option<String>) -> Result<()> {
    let email = email_or_prompt(email)?;
    let outcome = ctx.controller.handle_reset(&email).await;
    if !outcome.success {
        return Err(UserError(outcome.message).into());
    }
    output::print_success(&outcome.message, &ctx.format);
    Ok(())
}

pub async fn resend_confirmation(ctx: &AppContext, email: Option<String>) -> Result<()> {
    let email = email_or_prompt(email)?;
    let outcome = ctx.controller.handle_resend(&email).await;
    if !outcome.success {
        return Err(UserError(outcome.message).into());
    }
    output::print_success(&outcome.message, &ctx.format);
    Ok(())
}
