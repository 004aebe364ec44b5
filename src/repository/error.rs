//! Tipos de erro para o repositório remoto de jobs.
//!
//! Define [`RepositoryError`] com variantes para respostas de erro do servidor,
//! falhas de rede e respostas que não puderam ser decodificadas.

use thiserror::Error;

/// Erros que podem ocorrer ao falar com o backend da oficina.
///
/// - [`Server`](RepositoryError::Server) — o servidor respondeu com status não-2xx
/// - [`Network`](RepositoryError::Network) — falha na camada de rede
/// - [`Decode`](RepositoryError::Decode) — corpo da resposta em formato inesperado
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Resposta HTTP de erro. `detail` vem do campo `detail` do corpo JSON, quando existe.
    #[error("server returned status {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Server { status: u16, detail: Option<String> },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// O corpo da resposta não corresponde ao formato esperado.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RepositoryError {
    /// Mensagem fornecida pelo servidor, para exibir como legenda da notificação.
    pub fn detail(&self) -> Option<&str> {
        match self {
            RepositoryError::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RepositoryError::Server { status, .. } => Some(*status),
            RepositoryError::Network(e) => e.status().map(|s| s.as_u16()),
            RepositoryError::Decode(_) => None,
        }
    }

    /// Sessão expirada; a camada de autenticação cuida disso, então não notificamos.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
