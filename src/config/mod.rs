// Configuration module
// Local settings plus the prompts/template documents fetched at startup

mod assets;
pub mod constants;
mod loader;
mod prompts;
mod settings;

pub use assets::{fetch_document, AssetLoader, Assets};
pub use loader::{load_config, load_config_from};
pub use prompts::{PromptTemplates, PromptsConfig};
pub use settings::{
    AssetsConfig, Config, OutputConfig, QuotaConfig, StoreConfig, TransportConfig, TransportKind,
};
