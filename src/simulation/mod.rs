// Simulation Module
// Paper trading against live public market data

pub mod paper_exchange;

pub use paper_exchange::PaperExchange;
