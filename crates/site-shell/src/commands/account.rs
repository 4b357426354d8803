//! Account commands: credits, plan, dashboard handoff.

use super::{AppContext, UserError};
use crate::output;
use crate::routes::dashboard_handoff_url;
use anyhow::Result;
use clap::ValueEnum;
use credential_store::Session;
use profile_sync::{CreditKind, ProfileError, ProfileUpdate};
use tracing::warn;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CreditKindArg {
    Find,
    Verify,
}

impl From<CreditKindArg> for CreditKind {
    fn from(kind: CreditKindArg) -> Self {
        match kind {
            CreditKindArg::Find => CreditKind::Find,
            CreditKindArg::Verify => CreditKind::Verify,
        }
    }
}

async fn require_session(ctx: &AppContext) -> Result<Session> {
    match ctx.controller.sessions().current_session().await {
        Some(session) => Ok(session),
        None => Err(UserError("Not signed in. Run `mailsfinder login` first.".to_string()).into()),
    }
}

pub async fn deduct(ctx: &AppContext, kind: CreditKindArg) -> Result<()> {
    let session = require_session(ctx).await?;
    let kind: CreditKind = kind.into();

    match ctx
        .profiles
        .deduct_credit(
            ctx.controller.sessions().store(),
            &session.access_token,
            &session.user_id,
            kind,
        )
        .await
    {
        Ok(remaining) => {
            output::print_success(
                &format!("Used 1 {} credit. {} remaining.", kind.as_str(), remaining),
                &ctx.format,
            );
            Ok(())
        }
        Err(ProfileError::InsufficientCredits { kind, .. }) => Err(UserError(format!(
            "No {} credits left. Upgrade your plan to continue.",
            kind
        ))
        .into()),
        Err(e) => Err(e.into()),
    }
}

pub async fn set_plan(
    ctx: &AppContext,
    plan: String,
    days: i64,
    subscription_id: Option<String>,
    customer_id: Option<String>,
) -> Result<()> {
    let session = require_session(ctx).await?;

    let update = ProfileUpdate {
        plan: Some(plan),
        plan_expiry: Some(chrono::Utc::now() + chrono::Duration::days(days)),
        subscription_id,
        customer_id,
        ..Default::default()
    };
    let profile = ctx
        .profiles
        .update(
            ctx.controller.sessions().store(),
            &session.access_token,
            &session.user_id,
            &update,
        )
        .await?;

    output::print_heading("Plan");
    output::print_row("Plan", &profile.plan);
    output::print_row("Expires", &profile.plan_expiry.to_rfc3339());
    output::print_row("Find credits", &profile.credits_find.to_string());
    output::print_row("Verify credits", &profile.credits_verify.to_string());
    Ok(())
}

pub async fn dashboard(ctx: &AppContext) -> Result<()> {
    let session = require_session(ctx).await?;

    let profile = ctx
        .profiles
        .fetch_with_cache(
            ctx.controller.sessions().store(),
            &session.access_token,
            &session.user_id,
        )
        .await
        .unwrap_or_else(|e| {
            warn!("Profile lookup failed, handing off without it: {}", e);
            None
        });

    let url = dashboard_handoff_url(&ctx.config.dashboard_url, &session, profile.as_ref())?;
    output::print_success(&format!("Opening {}", url), &ctx.format);
    if let Err(e) = open::that(url.as_str()) {
        warn!("Could not open a browser: {}", e);
        println!("Open this URL manually: {}", url);
    }

    // The dashboard can spend credits; don't trust the cache afterwards.
    ctx.controller.sessions().store().request_refresh();
    Ok(())
}
