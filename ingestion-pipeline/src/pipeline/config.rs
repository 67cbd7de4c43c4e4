use common::{error::AppError, storage::index_manager::MAX_UPSERT_BATCH, utils::config::AppConfig};

#[derive(Debug, Clone)]
pub struct IngestionTuning {
    pub chunk_size: usize,
    pub upsert_batch_size: usize,
}

impl Default for IngestionTuning {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            upsert_batch_size: MAX_UPSERT_BATCH,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestionConfig {
    pub tuning: IngestionTuning,
}

impl IngestionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            tuning: IngestionTuning {
                chunk_size: config.chunk_size,
                upsert_batch_size: config.upsert_batch_size,
            },
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let batch_size = self.tuning.upsert_batch_size;
        if batch_size == 0 || batch_size > MAX_UPSERT_BATCH {
            return Err(AppError::Validation(format!(
                "upsert batch size must be between 1 and {MAX_UPSERT_BATCH}, got {batch_size}"
            )));
        }
        if self.tuning.chunk_size == 0 {
            return Err(AppError::Validation(
                "chunk size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
