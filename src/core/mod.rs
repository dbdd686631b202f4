//! Core module - platform-independent scoreboard logic

pub mod backoff;
pub mod constants;
pub mod feed;
pub mod format;
pub mod highlight;
pub mod input;
pub mod io_traits;
pub mod protocol;
pub mod rows;
pub mod scroll_engine;
pub mod session;
pub mod timing;
pub mod traits;
pub mod types;
pub mod view;

pub use backoff::ReconnectBackoff;
pub use feed::{FeedChange, ResultsFeed};
pub use format::{category_from_race_name, format_name};
pub use highlight::{HighlightDecision, HighlightResolver};
pub use input::{NavKey, UserInput};
pub use io_traits::{ConnectionStatus, FeedEvent, FeedReceiver};
pub use protocol::{parse_inbound, InboundMessage, ProtocolError};
pub use scroll_engine::{EngineEvent, ScrollEngine};
pub use session::{ScoreboardSession, SessionEvent, SessionSettings};
pub use timing::{FormFactor, ScrollTiming};
pub use traits::{ResultsView, ScrollSurface};
pub use types::{Bib, BibValue, CompetitorRow, ResultsSnapshot, ScrollPhase};
pub use view::{format_board, ListContainer};
