//! Terminal rendering surface for the navbar model.

use crate::output;
use crate::routes::Route;
use navbar_presenter::{NavbarModel, NavbarSurface};

/// Renders the navbar model as a terminal block.
pub struct TerminalNavbar;

impl NavbarSurface for TerminalNavbar {
    fn apply(&self, model: &NavbarModel) {
        match model {
            NavbarModel::SignedOut => {
                output::print_heading("Account");
                println!(
                    "  Not signed in. Run `mailsfinder login` ({}) or `mailsfinder signup` ({}).",
                    Route::Login.path(),
                    Route::Signup.path()
                );
            }
            NavbarModel::SignedIn {
                email,
                display_name,
                plan,
                credits_find,
                credits_verify,
            } => {
                output::print_heading(&format!("Account: {}", display_name));
                output::print_row("Email", email);
                if let Some(plan) = plan {
                    output::print_row("Plan", plan);
                }
                if let (Some(find), Some(verify)) = (credits_find, credits_verify) {
                    output::print_row("Find credits", &find.to_string());
                    output::print_row("Verify credits", &verify.to_string());
                }
            }
        }
    }
}
