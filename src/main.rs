use anyhow::{Result, bail};
use clap::Parser;
use console::Style;

use shopflow::cli::{Cli, Command, EtaKind};
use shopflow::config::ShopflowConfig;
use shopflow::eta::{Clock, ETA_FORMAT, SystemClock, approval_eta_at, replacement_part_eta_at};
use shopflow::notify::TracingNotifier;
use shopflow::repository::{Filters, HttpJobRepository};
use shopflow::ui::{self, RemoteProgress, TerminalConfirmation};
use shopflow::{
    JobCollection, JobId, JobState, TransitionCoordinator, TransitionOutcome, WorkflowDefinition,
};

type CliCoordinator = TransitionCoordinator<HttpJobRepository, TerminalConfirmation, TracingNotifier>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ShopflowConfig::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    shopflow::telemetry::init(if cli.verbose { "debug" } else { config.log_filter.as_str() });

    match cli.command {
        Command::States { state } => print_states(state),
        Command::Eta { kind, at } => {
            let now = at.unwrap_or_else(|| SystemClock.now());
            let eta = match kind {
                EtaKind::Approval => approval_eta_at(now),
                EtaKind::Parts => replacement_part_eta_at(now),
            };
            println!("{}", eta.format(ETA_FORMAT));
        }
        command => {
            let coordinator = TransitionCoordinator::new(
                JobCollection::new(config.pagination()),
                HttpJobRepository::new(&config.api_base_url),
                TerminalConfirmation::default(),
                TracingNotifier,
            );
            run_remote(&coordinator, command).await?;
        }
    }
    Ok(())
}

fn print_states(only: Option<JobState>) {
    let states = match only {
        Some(state) => vec![state],
        None => JobState::ALL.to_vec(),
    };
    for state in states {
        let style = ui::style_for(WorkflowDefinition::color_of(state));
        let next: Vec<String> = WorkflowDefinition::next_states(state)
            .iter()
            .map(ToString::to_string)
            .collect();
        let next = if next.is_empty() {
            "(final)".to_string()
        } else {
            next.join(", ")
        };
        println!("{:<22} → {next}", style.apply_to(state));
    }
}

async fn run_remote(coordinator: &CliCoordinator, command: Command) -> Result<()> {
    match command {
        Command::List {
            search,
            state,
            advisor,
            page,
        } => {
            let progress = RemoteProgress::start("Cargando trabajos...");
            let mut pagination = coordinator.pagination();
            pagination.page = page;
            let filters = Filters {
                search,
                state,
                service_advisor: advisor,
                date_range: None,
            };
            let loaded = coordinator.set_query(filters, pagination).await;
            progress.clear();
            loaded?;
            let snapshot = coordinator.snapshot();
            ui::print_jobs(&snapshot.jobs, snapshot.total);
        }
        Command::History { id } => {
            let progress = RemoteProgress::start("Cargando historial...");
            let history = coordinator.fetch_history(JobId(id)).await;
            progress.clear();
            ui::print_history(&history?);
        }
        Command::Move { id, state } => {
            locate(coordinator, JobId(id)).await?;
            match coordinator.request_transition(JobId(id), state).await {
                Ok(TransitionOutcome::Updated(job)) => {
                    println!("  {} #{} → {}", ok_mark(), job.id, job.current_state);
                }
                Ok(TransitionOutcome::Delivered(id)) => {
                    println!("  {} #{id} entregado", ok_mark());
                }
                Err(err) if err.is_cancelled() => println!("Cancelado."),
                Err(err) => bail!(err),
            }
        }
        Command::Describe { id, text } => {
            locate(coordinator, JobId(id)).await?;
            let progress = RemoteProgress::start("Guardando descripción...");
            match coordinator.update_description(JobId(id), &text).await {
                Ok(_) => progress.success("Descripción actualizada."),
                Err(err) => {
                    progress.failure(&err.to_string());
                    bail!(err);
                }
            }
        }
        Command::States { .. } | Command::Eta { .. } => {}
    }
    Ok(())
}

async fn locate(coordinator: &CliCoordinator, id: JobId) -> Result<()> {
    let progress = RemoteProgress::start(&format!("Buscando trabajo #{id}..."));
    let result = page_until_found(coordinator, id).await;
    progress.clear();
    result
}

/// Pages through the active list until job `id` is loaded.
async fn page_until_found(coordinator: &CliCoordinator, id: JobId) -> Result<()> {
    coordinator.refresh().await?;
    loop {
        if coordinator.find(id).is_some() {
            return Ok(());
        }
        let mut pagination = coordinator.pagination();
        let seen = u64::from(pagination.page) * u64::from(pagination.rows_per_page);
        if seen >= coordinator.snapshot().total {
            bail!("Job not found among active jobs: {id}");
        }
        pagination.page += 1;
        coordinator.set_pagination(pagination).await?;
    }
}

fn ok_mark() -> console::StyledObject<&'static str> {
    Style::new().green().bold().apply_to("✓")
}
