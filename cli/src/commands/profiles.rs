//! Profiles command implementation

use crate::output;
use crate::GlobalArgs;
use anyhow::Result;
use clap::Subcommand;
use comfy_table::{presets, Table};
use std::process::ExitCode;
use trawl_client::Settings;

#[derive(Subcommand, Debug)]
pub enum ProfilesCommand {
    /// List configured profiles
    List,
}

pub fn run(global: &GlobalArgs, command: ProfilesCommand) -> Result<ExitCode> {
    match command {
        ProfilesCommand::List => {
            let settings = global.settings()?;
            if settings.profiles.is_empty() {
                output::info("No profiles configured.");
            } else {
                println!("{}", profiles_table(&settings));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn profiles_table(settings: &Settings) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_header(vec!["Profile", "Address", "Token"]);

    for (name, profile) in &settings.profiles {
        table.add_row(vec![
            name.clone(),
            profile.address.clone().unwrap_or_default(),
            output::token_presence(profile.token.as_deref()),
        ]);
    }
    table
}
