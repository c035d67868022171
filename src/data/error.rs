use serde::Serialize;
use thiserror::Error;

/// Failures that stop the current evaluation: nothing downstream of the
/// loader runs.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Erro ao carregar o arquivo: {0:#}")]
    FileParse(#[from] anyhow::Error),

    #[error("Formato de arquivo não suportado: .{0}")]
    UnsupportedExtension(String),

    #[error("O arquivo deve conter uma coluna chamada '{0}'.")]
    MissingRequiredColumn(String),

    #[error("A coluna '{0}' não contém nenhuma data válida.")]
    NoValidDates(String),
}

/// Non-fatal conditions: the affected stage is skipped, the others continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum Warning {
    #[error("O conjunto de dados precisa ter pelo menos duas colunas numéricas.")]
    InsufficientNumericColumns,

    #[error("Dados insuficientes para calcular a correlação ou plotar o gráfico.")]
    InsufficientPairedRows,

    #[error("Selecione variáveis diferentes para calcular a correlação.")]
    IdenticalAxisSelection,

    #[error("Uma das variáveis é constante; a correlação não é definida.")]
    ConstantInput,
}
