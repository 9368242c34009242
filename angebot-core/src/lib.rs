pub mod collab;
pub mod error;
pub mod model;
pub mod schedule;
pub mod state;
pub mod sync;

pub use collab::{CollabError, ContractRenderer, Extractor};
pub use error::OfferError;
pub use model::{HistoryEntry, IntakeRecord, Offer, OfferSource, OfferState};
pub use schedule::{is_expired, is_reminder_due};
pub use state::{transition, OfferAction};
pub use sync::{OfferStore, SyncError, SyncState};
