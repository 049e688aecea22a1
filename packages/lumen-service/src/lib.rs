pub mod engine;
pub mod history;
pub mod message;
pub mod notify;
pub mod runtime;
pub mod session;
pub mod store;
pub mod transport;
pub mod view;

mod error;

use std::{future::Future, pin::Pin};

pub use engine::{Engine, EngineOptions};
pub use error::{Error, Result};
pub use history::{FileHistory, HistoryEntry, HistorySnapshot, HistoryStore, MemoryHistory};
pub use message::{
	InboundMessage, MoreLikeThisQuery, OutboundMessage, QueryContainer, QueryTerm, SimilarityQuery,
};
pub use notify::{ChangeEvent, ConnectionStatus, Notification, StatusReport};
pub use runtime::EngineHandle;
pub use session::{QuerySession, SessionState};
pub use store::{ResultStore, SimilarityOutcome, StoreState};
pub use transport::{ChannelTransport, Transport};
pub use view::{MediaTypeSummary, RankedObject, RankedSegment, ResultView};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
