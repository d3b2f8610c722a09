use anc_core::{ClinicalReport, CoreConfig, ReportService};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "anc")]
#[command(about = "ANC report service CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all reports, newest first
    List,
    /// Show one report as JSON
    Show {
        /// Report id (32 lowercase hex characters)
        id: String,
    },
    /// List the reports for one pregnancy, newest first
    ByPregnancy {
        /// Pregnancy identifier
        pregnancy_id: String,
    },
    /// Register a pregnancy
    Register {
        /// Pregnancy identifier
        pregnancy_id: String,
        /// Registration details as a JSON object (optional)
        #[arg(long)]
        data: Option<String>,
    },
    /// Relink reports missing from their pregnancy registration
    Reconcile,
}

fn print_summary(reports: &[ClinicalReport]) {
    if reports.is_empty() {
        println!("No reports found.");
        return;
    }
    for report in reports {
        println!(
            "ID: {}, Pregnancy: {}, Created: {}, Alerts: {}",
            report.id,
            report.pregnancy_id,
            report.created_at.to_rfc3339(),
            report.alerts.len()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("anc_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'anc --help' for commands");
        return Ok(());
    };

    let service = ReportService::from_config(Arc::new(CoreConfig::from_env()?))?;

    match command {
        Commands::List => {
            let reports = service.list_reports().await?;
            print_summary(&reports);
        }
        Commands::Show { id } => match service.fetch_report(&id).await {
            Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            Err(e) => eprintln!("Error fetching report: {}", e),
        },
        Commands::ByPregnancy { pregnancy_id } => {
            let reports = service.fetch_reports_by_pregnancy(&pregnancy_id).await?;
            print_summary(&reports);
        }
        Commands::Register { pregnancy_id, data } => {
            let data = data
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                .transpose()?;
            match service.register_pregnancy(&pregnancy_id, data).await {
                Ok(record) => println!("Registered pregnancy: {}", record.pregnancy_id),
                Err(e) => eprintln!("Error registering pregnancy: {}", e),
            }
        }
        Commands::Reconcile => {
            let summary = service.reconcile().await?;
            println!(
                "Scanned: {}, Relinked: {}, Orphaned: {}",
                summary.scanned, summary.relinked, summary.orphaned
            );
        }
    }

    Ok(())
}
