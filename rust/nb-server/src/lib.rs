//! nb-server: Session loop + single-tenant connection manager.

pub mod error;
pub mod server;
pub mod session;

use tracing::info;

use nb_core::Config;
use nb_model::LstmModel;

pub use error::{ServerError, SessionEnd, SessionError};
pub use server::{ServeSummary, Server, ServerOptions, SessionReport};
pub use session::{Session, SessionOptions, SessionStats};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load the configured model artifact. Any failure here must stop startup.
pub fn load_model(cfg: &Config) -> Result<LstmModel, ServerError> {
    let path = cfg.model.resolve()?;
    info!(path = %path.display(), "loading model");
    let model = LstmModel::load(&path)?;
    info!(
        input_dim = nb_model::SequenceModel::input_dim(&model),
        hidden_dim = model.hidden_dim(),
        layers = model.num_layers(),
        "model loaded"
    );
    Ok(model)
}


#[cfg(test)]
mod test_support;
