//! Configuração do shopflow carregada a partir de `shopflow.toml`.
//!
//! A struct [`ShopflowConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `SHOPFLOW_API_URL` tem precedência sobre o arquivo.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use crate::repository::Pagination;

/// Configuração de nível superior carregada de `shopflow.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopflowConfig {
    /// URL base da API da oficina.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Quantidade de jobs por página na listagem.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Coluna usada para ordenar a listagem.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    /// Ordenação decrescente por padrão.
    #[serde(default = "default_descending")]
    pub descending: bool,

    /// Filtro de log no formato do `EnvFilter` (ex.: "info", "shopflow=debug").
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

// Valor padrão para a URL da API: backend local.
fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

// Valor padrão para o tamanho da página: 15.
fn default_page_size() -> u32 {
    15
}

// Valor padrão para a ordenação: data de criação do pedido.
fn default_sort_by() -> String {
    "fecha_creacion_pedido".to_string()
}

fn default_descending() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ShopflowConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            page_size: default_page_size(),
            sort_by: default_sort_by(),
            descending: default_descending(),
            log_filter: default_log_filter(),
        }
    }
}

impl ShopflowConfig {
    /// Carrega a configuração de `shopflow.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("shopflow.toml"))
    }

    /// Carrega a configuração de um caminho específico.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<ShopflowConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração para a URL.
        if let Ok(url) = std::env::var("SHOPFLOW_API_URL")
            && !url.is_empty()
        {
            config.api_base_url = url;
        }

        Ok(config)
    }

    /// Paginação inicial da listagem derivada da configuração.
    pub fn pagination(&self) -> Pagination {
        Pagination {
            sort_by: self.sort_by.clone(),
            descending: self.descending,
            page: 1,
            rows_per_page: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let config = ShopflowConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.page_size, 15);
        assert_eq!(config.sort_by, "fecha_creacion_pedido");
        assert!(config.descending);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            page_size = 30
            descending = false
        "#;
        let config: ShopflowConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.page_size, 30);
        assert!(!config.descending);
        assert_eq!(config.sort_by, "fecha_creacion_pedido");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sort_by = \"id\"\nlog_filter = \"shopflow=debug\"").unwrap();

        let config = ShopflowConfig::load_from(file.path()).unwrap();
        assert_eq!(config.sort_by, "id");
        assert_eq!(config.log_filter, "shopflow=debug");

        let pagination = config.pagination();
        assert_eq!(pagination.sort_by, "id");
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.rows_per_page, 15);
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShopflowConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.page_size, 15);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_size = \"muchos\"").unwrap();
        assert!(ShopflowConfig::load_from(file.path()).is_err());
    }
}
