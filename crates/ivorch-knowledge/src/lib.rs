pub mod knowledge_base;
pub mod oracle;
pub mod store;

pub use knowledge_base::KnowledgeBase;
pub use oracle::{FactOracle, OracleMatch, OracleResult};
