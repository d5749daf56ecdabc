mod errors;
mod state;

pub use errors::AppError;
pub use state::{paginate, AppState};
