pub mod api;
pub mod config;
pub mod history;
pub mod library;
pub mod models;
pub mod pipeline;
pub mod service;

pub use api::{ApiError, ApiServer, ApiServerConfig};
pub use config::AppConfig;
pub use history::QueryLog;
pub use library::InMemoryLibrary;
pub use models::{
    ChunkHit, NewPaper, PaperStats, PaperSummary, PopularTopics, QueryRecord, QueryRequest,
    QueryResponse, TopicCount,
};
pub use pipeline::{AnswerPipeline, LibraryError, PaperLibrary};
pub use service::{QaService, ServiceError};
