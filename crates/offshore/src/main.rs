use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use offshore::models::{
    AnalysisPatch, NewAlert, NewAnalysis, NewAssetSubclass, NewComponent, NewCountry,
    NewIndicator, RiskProfileName, Severity, Trend,
};
use offshore::research::pdf::PdfRenderer;
use offshore::research::scoring::QUESTIONS;
use offshore::research::{
    report_file_name, score, stance_timeline, AdminSession, Answers, ReportFilters, ResearchError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "offshore", about = "Offshore investment research platform")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/offshore.toml")]
    config: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema and seed the risk profiles
    InitDb,
    /// Print the suitability questionnaire
    Questions,
    /// Score questionnaire answers and show the matching model portfolio
    Profile {
        /// Zero-based option per question, e.g. `1,2,0`
        #[arg(long, value_delimiter = ',', required = true)]
        answers: Vec<usize>,
    },
    /// List countries with their selector labels
    Countries,
    /// List analyses for one view, newest first
    Analyses {
        #[arg(long, value_enum)]
        view: View,
        /// Country, asset class, subclass or theme id (not used for theses)
        #[arg(long)]
        id: Option<i64>,
    },
    /// Show the economic indicators of a country
    Indicators {
        #[arg(long)]
        country: i64,
    },
    /// Stance history of a country's macro or central bank views
    Timeline {
        #[arg(long)]
        country: i64,
        #[arg(long)]
        central_bank: bool,
    },
    /// Write the consolidated PDF report
    Report {
        #[arg(long, value_delimiter = ',')]
        countries: Vec<i64>,
        #[arg(long, value_delimiter = ',')]
        asset_classes: Vec<i64>,
        #[arg(long, value_delimiter = ',')]
        themes: Vec<i64>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Administrative writes, unlocked by the configured password
    Admin {
        #[arg(long)]
        password: String,
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum View {
    Macro,
    CentralBank,
    Asset,
    MicroAsset,
    Thematic,
    Thesis,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    /// Create an analysis from a JSON file (`-` for stdin)
    AddAnalysis { file: String },
    /// Patch an analysis from a JSON file (`-` for stdin)
    UpdateAnalysis {
        #[arg(long)]
        id: i64,
        file: String,
    },
    DeleteAnalysis {
        #[arg(long)]
        id: i64,
    },
    /// Insert or update an indicator by country and name
    SetIndicator {
        #[arg(long)]
        country: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        value: String,
        #[arg(long)]
        period: String,
        /// Decorated labels such as "Rising ↗️" are accepted
        #[arg(long, default_value = "N/A", value_parser = Trend::from_label)]
        trend: Trend,
    },
    AddAlert {
        #[arg(long)]
        title: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        severity: Severity,
        #[arg(long)]
        description: Option<String>,
    },
    AddCountry {
        #[arg(long)]
        name: String,
        #[arg(long)]
        flag: Option<String>,
    },
    AddManager {
        #[arg(long)]
        name: String,
    },
    AddTheme {
        #[arg(long)]
        name: String,
    },
    AddAssetClass {
        #[arg(long)]
        name: String,
    },
    AddAssetSubclass {
        #[arg(long)]
        name: String,
        #[arg(long)]
        asset_class: i64,
    },
    AddAllocation {
        #[arg(long)]
        profile: RiskProfileName,
        #[arg(long)]
        strategy: String,
    },
    /// Replace all components of an allocation from a JSON array (`-` for stdin)
    SetComponents {
        #[arg(long)]
        allocation: i64,
        file: String,
    },
    /// List model allocations by profile
    Allocations,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing (respects RUST_LOG env var)
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ResearchError>() {
                Some(research) => eprintln!("{}", offshore::user_message(research)),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn answer_indices(answers: Vec<usize>) -> Result<[usize; 3]> {
    let count = answers.len();
    match <[usize; 3]>::try_from(answers) {
        Ok(indices) => Ok(indices),
        Err(_) => bail!("expected exactly three answers, got {count}"),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = offshore::load_config(&cli.config)?;
    let pretty = cli.pretty;

    if let Command::Questions = cli.command {
        for (i, question) in QUESTIONS.iter().enumerate() {
            println!("{}. {}", i + 1, question.prompt);
            for (j, option) in question.options.iter().enumerate() {
                println!("   [{j}] {option}");
            }
        }
        return Ok(());
    }

    let services = offshore::build_services(&config).context("Failed to build services")?;

    match cli.command {
        Command::Questions => {}
        Command::InitDb => {
            let profiles = offshore::init_db(&services).await?;
            info!(profiles = profiles.len(), "Database ready");
            emit(&profiles, pretty)?;
        }
        Command::Profile { answers } => {
            let assessment = score(&Answers::from_indices(answer_indices(answers)?)?);
            let allocation = services.allocations.resolve(assessment.profile).await?;
            if allocation.is_empty() {
                eprintln!("The {} strategy has no components defined yet.", assessment.profile);
            }
            emit(
                &serde_json::json!({ "assessment": assessment, "allocation": allocation }),
                pretty,
            )?;
        }
        Command::Countries => emit(&services.browser.countries().await?, pretty)?,
        Command::Analyses { view, id } => {
            let browser = &services.browser;
            let rows = match (view, id) {
                (View::Thesis, _) => browser.thesis_view().await?,
                (_, None) => bail!("--id is required for the {view:?} view"),
                (View::Macro, Some(id)) => browser.macro_view(id).await?,
                (View::CentralBank, Some(id)) => browser.central_bank_views(id).await?,
                (View::Asset, Some(id)) => browser.asset_view(id).await?,
                (View::MicroAsset, Some(id)) => browser.micro_asset_view(id).await?,
                (View::Thematic, Some(id)) => browser.thematic_view(id).await?,
            };
            if rows.is_empty() {
                eprintln!("No analyses found for this selection.");
            }
            emit(&rows, pretty)?;
        }
        Command::Indicators { country } => {
            let indicators = services.browser.indicators(country).await?;
            if indicators.is_empty() {
                eprintln!("No indicators recorded for this country.");
            }
            emit(&indicators, pretty)?;
        }
        Command::Timeline {
            country,
            central_bank,
        } => {
            let rows = if central_bank {
                services.browser.central_bank_views(country).await?
            } else {
                services.browser.macro_view(country).await?
            };
            emit(&stance_timeline(&rows), pretty)?;
        }
        Command::Report {
            countries,
            asset_classes,
            themes,
            out_dir,
        } => {
            let filters = ReportFilters {
                countries: countries.into_iter().collect(),
                asset_classes: asset_classes.into_iter().collect(),
                themes: themes.into_iter().collect(),
            };
            let report = services.reports.assemble(&filters).await?;
            let renderer = PdfRenderer::from_config(&config.report).map_err(ResearchError::from)?;
            let bytes = renderer.render(&report).map_err(ResearchError::from)?;

            let name = report_file_name(&config.report.file_prefix, report.generated_at.date_naive());
            let path = out_dir.join(name);
            std::fs::write(&path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), sections = report.sections.len(), "Wrote report");
            println!("{}", path.display());
        }
        Command::Admin { password, action } => {
            let session = services.admin.unlock(&password)?;
            run_admin(&session, action, pretty).await?;
        }
    }
    Ok(())
}

async fn run_admin(session: &AdminSession, action: AdminAction, pretty: bool) -> Result<()> {
    match action {
        AdminAction::AddAnalysis { file } => {
            let new: NewAnalysis = read_json(&file)?;
            emit(&session.create_analysis(&new).await?, pretty)
        }
        AdminAction::UpdateAnalysis { id, file } => {
            let patch: AnalysisPatch = read_json(&file)?;
            emit(&session.update_analysis(id, &patch).await?, pretty)
        }
        AdminAction::DeleteAnalysis { id } => {
            session.delete_analysis(id).await?;
            println!("Deleted analysis {id}");
            Ok(())
        }
        AdminAction::SetIndicator {
            country,
            name,
            value,
            period,
            trend,
        } => {
            let new = NewIndicator {
                country_id: country,
                indicator_name: name,
                current_value: value,
                reference_period: period,
                trend,
            };
            emit(&session.upsert_indicator(&new).await?, pretty)
        }
        AdminAction::AddAlert {
            title,
            kind,
            severity,
            description,
        } => {
            let new = NewAlert {
                title,
                alert_kind: kind,
                severity,
                description,
            };
            emit(&session.create_alert(&new).await?, pretty)
        }
        AdminAction::AddCountry { name, flag } => {
            let new = NewCountry {
                name,
                flag_emoji: flag,
            };
            emit(&session.create_country(&new).await?, pretty)
        }
        AdminAction::AddManager { name } => emit(&session.create_manager(&name).await?, pretty),
        AdminAction::AddTheme { name } => emit(&session.create_theme(&name).await?, pretty),
        AdminAction::AddAssetClass { name } => {
            emit(&session.create_asset_class(&name).await?, pretty)
        }
        AdminAction::AddAssetSubclass { name, asset_class } => {
            let new = NewAssetSubclass {
                name,
                asset_class_id: asset_class,
            };
            emit(&session.create_asset_subclass(&new).await?, pretty)
        }
        AdminAction::AddAllocation { profile, strategy } => {
            emit(&session.create_allocation(profile, &strategy).await?, pretty)
        }
        AdminAction::SetComponents { allocation, file } => {
            let components: Vec<NewComponent> = read_json(&file)?;
            emit(
                &session.replace_components(allocation, &components).await?,
                pretty,
            )
        }
        AdminAction::Allocations => {
            let listed: Vec<_> = session
                .allocations()
                .await?
                .into_iter()
                .map(|(profile, allocation)| {
                    serde_json::json!({ "profile": profile, "allocation": allocation })
                })
                .collect();
            emit(&listed, pretty)
        }
    }
}

fn read_json<T: DeserializeOwned>(file: &str) -> Result<T> {
    let raw = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read input: {file}"))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse JSON from {file}"))
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_answers(args: &[&str]) -> Vec<usize> {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Profile { answers } => answers,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn comma_separated_answers_parse() {
        let answers = parse_answers(&["offshore", "profile", "--answers", "1,2,0"]);
        assert_eq!(answer_indices(answers).unwrap(), [1, 2, 0]);
    }

    #[test]
    fn wrong_answer_count_reaches_the_friendly_message() {
        let answers = parse_answers(&["offshore", "profile", "--answers", "1,2"]);
        let err = answer_indices(answers).unwrap_err();
        assert_eq!(err.to_string(), "expected exactly three answers, got 2");

        let answers = parse_answers(&["offshore", "profile", "--answers", "1,2,0,1"]);
        assert!(answer_indices(answers).is_err());
    }
}
