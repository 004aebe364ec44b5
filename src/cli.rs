//! Interface de linha de comando do shopflow baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (states, eta, list,
//! history, move, describe) e flags globais (--api-url, --verbose).

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};

use crate::workflow::JobState;

/// shopflow — Fluxo de trabalhos da oficina: estados, ETAs e transições.
#[derive(Debug, Parser)]
#[command(name = "shopflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// URL base da API (sobrescreve `shopflow.toml` e `SHOPFLOW_API_URL`).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Tipo de ETA calculada pelo subcomando `eta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EtaKind {
    /// Prazo para aprovação do cliente (2 dias úteis).
    Approval,
    /// Chegada de peça encomendada (regra de corte às 13h, sempre às 11:00).
    Parts,
}

/// Converte texto da CLI (ex.: "trabajo detenido") em [`JobState`].
fn parse_state(raw: &str) -> Result<JobState, String> {
    raw.parse::<JobState>().map_err(|e| e.to_string())
}

fn parse_local_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM: {e}"))
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mostra a tabela de transições (ou as saídas de um estado).
    States {
        #[arg(value_parser = parse_state)]
        state: Option<JobState>,
    },

    /// Calcula uma ETA em dias úteis.
    Eta {
        #[arg(value_enum)]
        kind: EtaKind,

        /// Instante local de referência (padrão: agora).
        #[arg(long, value_parser = parse_local_datetime)]
        at: Option<NaiveDateTime>,
    },

    /// Lista os trabalhos ativos.
    List {
        #[arg(long)]
        search: Option<String>,

        #[arg(long, value_parser = parse_state)]
        state: Option<JobState>,

        #[arg(long)]
        advisor: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Mostra o histórico de estados de um trabalho.
    History { id: u64 },

    /// Move um trabalho para outro estado.
    Move {
        id: u64,

        #[arg(value_parser = parse_state)]
        state: JobState,
    },

    /// Atualiza a descrição da tarefa de um trabalho.
    Describe { id: u64, text: String },
}
