use clap::Parser;
use rc_filter_agent::config::load_dotenv;
use rc_filter_agent::utils::{logger, validation::Validate};
use rc_filter_agent::{
    ChatCompletionClient, CliConfig, DesignEngine, DesignError, DesignSource, LocalStorage,
};

fn fail(e: &DesignError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting rc-filter-agent");

    if let Some(path) = load_dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if cli.verbose {
        // Never log the credential.
        tracing::debug!(
            "Resolved settings: request={:?}, base_url={}, model={}, timeout={}s, output={:?}, render={:?}",
            config.request,
            config.service.base_url,
            config.service.model,
            config.service.timeout_seconds,
            config.output,
            config.render
        );
    }

    if let Err(e) = config.validate() {
        fail(&e);
    }

    let client = match ChatCompletionClient::new(&config.service) {
        Ok(client) => client,
        Err(e) => fail(&e),
    };

    println!(
        "Designing RC bandpass filter with center frequency {} Hz and bandwidth {} Hz",
        config.request.center_freq, config.request.bandwidth
    );

    let storage = LocalStorage::new(config.output.directory.clone());
    let engine = DesignEngine::new(client, storage)
        .with_render_settings(config.render)
        .with_file_name(config.output.file_name.clone());

    match engine.run(&config.request).await {
        Ok(outcome) => {
            match &outcome.result.source {
                DesignSource::Model { strategy } => {
                    println!("Designed filter component values (model, {}):", strategy)
                }
                DesignSource::ClosedForm { .. } => {
                    println!("Designed filter component values (closed-form fallback):")
                }
            }
            for (label, value) in outcome.result.components.iter() {
                println!("  {}: {}", label, value);
            }
            println!("SPICE netlist saved to {}", outcome.netlist_path);
            println!("Simulation is not run here; load the netlist in a SPICE simulator to verify.");
        }
        Err(e) => fail(&e),
    }
}
