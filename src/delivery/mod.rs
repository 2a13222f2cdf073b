pub mod email;
pub mod sheets;

pub use email::EmailSender;
pub use sheets::{ProcedureRow, SheetsClient};
