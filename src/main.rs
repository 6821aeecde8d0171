use clap::Parser;
use log::*;
use std::process::ExitCode;

use depsaurus::{
    Args, Collaborators, UpgradeWorkflow, WorkflowResult, config::FileConfig,
    result::Result,
};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("depsaurus")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

fn print_summary(result: &WorkflowResult) {
    if !result.success {
        println!("\nUpgrade workflow failed: {}", result.message);
        return;
    }

    println!("\nUpgrade workflow completed successfully!");
    if let Some(dep) = &result.dependency {
        println!(
            "Dependency: {} upgraded from {} to {}",
            dep.name, dep.current_version, dep.latest_version
        );
    }
    if let Some(branch) = &result.branch_name {
        println!("Branch: {branch}");
    }
    match &result.pr_url {
        Some(url) => println!("Pull Request: {url}"),
        None => println!("{}", result.message),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli_args = Args::parse();

    initialize_logger(cli_args.debug)?;

    let file_config = FileConfig::load(&cli_args.repo)?;
    let config = cli_args.app_config(&file_config)?;
    debug!("model: {}, dry run: {}", config.model, config.dry_run);

    let collaborators = Collaborators::from_config(&config)?;
    let result = UpgradeWorkflow::new(&config, collaborators).run().await;

    print_summary(&result);

    if result.success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
