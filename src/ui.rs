//! Interface de terminal do shopflow — prompts, spinners e saída colorida.
//!
//! Usa `console` para ler respostas do usuário e estilizar a saída, e
//! `indicatif` para o spinner enquanto o backend responde. O
//! [`TerminalConfirmation`] é a implementação de [`ConfirmationPort`] usada pela CLI.

use chrono::Utc;
use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::confirmation::{
    Confirmation, ConfirmationKind, ConfirmationPort, ConfirmationRequest, DetentionReason,
    detention_context, technician_context,
};
use crate::eta::{Clock, EtaCalculator, SystemClock};
use crate::workflow::{Job, StateHistoryEntry, WorkflowDefinition};

/// Estilo de terminal aproximado para cada tag de cor do workflow.
pub fn style_for(tag: &str) -> Style {
    let style = Style::new();
    match tag {
        t if t.starts_with("grey") => style.dim(),
        t if t.starts_with("orange") => style.yellow(),
        t if t.starts_with("blue") => style.blue(),
        t if t.starts_with("red") => style.red(),
        t if t.starts_with("light-blue") || t == "teal" => style.cyan(),
        t if t.starts_with("green") => style.green(),
        "dark" => style.bold(),
        _ => style.magenta(),
    }
}

/// Escolha numérica (1-based) de um motivo de detenção.
fn parse_reason_choice(input: &str) -> Option<DetentionReason> {
    let index: usize = input.trim().parse().ok()?;
    DetentionReason::ALL.get(index.checked_sub(1)?).copied()
}

fn parse_technician(input: &str) -> Option<u64> {
    input.trim().parse().ok()
}

fn is_affirmative(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}

/// Pergunta ao usuário no terminal. Resposta vazia ou inválida cancela.
pub struct TerminalConfirmation<C = SystemClock> {
    term: Term,
    eta: EtaCalculator<C>,
    bold: Style,
}

impl Default for TerminalConfirmation<SystemClock> {
    fn default() -> Self {
        Self::new(EtaCalculator::default())
    }
}

impl<C: Clock> TerminalConfirmation<C> {
    pub fn new(eta: EtaCalculator<C>) -> Self {
        Self {
            term: Term::stderr(),
            eta,
            bold: Style::new().bold(),
        }
    }

    // Falha de leitura equivale a cancelar.
    fn ask(&self, prompt: &str) -> Option<String> {
        if let Err(e) = self.term.write_str(prompt) {
            warn!(error = %e, "could not write prompt");
            return None;
        }
        match self.term.read_line() {
            Ok(line) => Some(line),
            Err(e) => {
                warn!(error = %e, "could not read answer");
                None
            }
        }
    }

    fn detention(&self) -> Confirmation {
        let _ = self.term.write_line(&format!("{}", self.bold.apply_to("Motivo de detención:")));
        for (i, reason) in DetentionReason::ALL.iter().enumerate() {
            let _ = self.term.write_line(&format!("  {}) {reason}", i + 1));
        }
        let Some(reason) = self.ask("> ").as_deref().and_then(parse_reason_choice) else {
            return Confirmation::Cancelled;
        };
        let detail = self.ask("Detalle (opcional): ").unwrap_or_default();
        Confirmation::Provided(detention_context(reason, Some(&detail), &self.eta))
    }

    fn technician(&self) -> Confirmation {
        match self.ask("ID del técnico: ").as_deref().and_then(parse_technician) {
            Some(id) => Confirmation::Provided(technician_context(id)),
            None => Confirmation::Cancelled,
        }
    }

    fn delivery(&self, job: &Job) -> Confirmation {
        let plate = job
            .attribute("patente")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", job.id));
        match self.ask(&format!("¿Confirmar entrega de {plate}? [s/N] ")) {
            Some(answer) if is_affirmative(&answer) => Confirmation::approved(),
            _ => Confirmation::Cancelled,
        }
    }
}

impl<C: Clock> ConfirmationPort for TerminalConfirmation<C> {
    async fn request(
        &self,
        kind: ConfirmationKind,
        request: &ConfirmationRequest<'_>,
    ) -> Confirmation {
        match kind {
            ConfirmationKind::DetentionReason => self.detention(),
            ConfirmationKind::AssignTechnician => self.technician(),
            ConfirmationKind::ConfirmDelivery => self.delivery(request.job),
        }
    }
}

/// Spinner exibido enquanto uma chamada ao backend está em andamento.
pub struct RemoteProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl RemoteProgress {
    /// Inicia o spinner com a mensagem fornecida.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    pub fn success(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn failure(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }

    /// Remove o spinner sem mensagem (ex.: cancelamento).
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}

/// Imprime a listagem de jobs com o estado colorido.
pub fn print_jobs(jobs: &[Job], total: u64) {
    for job in jobs {
        let state = job.current_state;
        let style = style_for(WorkflowDefinition::color_of(state));
        let plate = job.attribute("patente").and_then(|v| v.as_str()).unwrap_or("-");
        let advisor = job.service_advisor().unwrap_or("-");
        println!(
            "{:>6}  {:<10} {:<22} {}",
            job.id,
            plate,
            style.apply_to(state),
            advisor
        );
    }
    println!("{} de {total}", jobs.len());
}

/// Imprime o histórico de estados com o tempo gasto em cada um.
pub fn print_history(history: &[StateHistoryEntry]) {
    let now = Utc::now();
    for entry in history {
        let style = style_for(WorkflowDefinition::color_of(entry.state));
        let elapsed = entry.elapsed(now);
        let reason = entry.detention_reason.as_deref().unwrap_or("");
        println!(
            "{}  {:<22} {:>4}h {:02}m  {reason}",
            entry.entered_at.format("%Y-%m-%d %H:%M"),
            style.apply_to(entry.state),
            elapsed.num_hours(),
            elapsed.num_minutes() % 60
        );
    }
}
