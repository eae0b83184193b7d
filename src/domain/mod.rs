pub mod contribution;
pub mod gift;
pub mod settings;

pub use contribution::*;
pub use gift::*;
pub use settings::*;
